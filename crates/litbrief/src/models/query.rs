use serde::{Deserialize, Serialize};

/// Lifecycle of a search query within one run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Waiting,
    Processing,
    Completed,
    Failed,
}

impl QueryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryStatus::Waiting => "waiting",
            QueryStatus::Processing => "processing",
            QueryStatus::Completed => "completed",
            QueryStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "waiting" => Some(QueryStatus::Waiting),
            "processing" => Some(QueryStatus::Processing),
            "completed" => Some(QueryStatus::Completed),
            "failed" => Some(QueryStatus::Failed),
            _ => None,
        }
    }

    /// Completed and failed are final for the run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, QueryStatus::Completed | QueryStatus::Failed)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: QueryStatus) -> bool {
        matches!(
            (self, next),
            (QueryStatus::Waiting, QueryStatus::Processing)
                | (QueryStatus::Waiting, QueryStatus::Failed)
                | (QueryStatus::Processing, QueryStatus::Completed)
                | (QueryStatus::Processing, QueryStatus::Failed)
        )
    }
}

impl std::fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A query string in the search service's field-prefixed syntax.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub id: String,
    pub query: String,
    pub is_selected: bool,
    pub status: QueryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchQuery {
    /// A new, selected query waiting to run.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            query: query.into(),
            is_selected: true,
            status: QueryStatus::Waiting,
            error: None,
        }
    }

    pub fn unselected(query: impl Into<String>) -> Self {
        Self {
            is_selected: false,
            ..Self::new(query)
        }
    }

    /// A fresh copy for a new run: new id, `waiting`, no error.
    pub fn fresh_copy(&self) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            query: self.query.clone(),
            is_selected: self.is_selected,
            status: QueryStatus::Waiting,
            error: None,
        }
    }

    pub fn mark_processing(&mut self) {
        debug_assert!(self.status.can_transition_to(QueryStatus::Processing));
        self.status = QueryStatus::Processing;
        self.error = None;
    }

    pub fn mark_completed(&mut self) {
        debug_assert!(self.status.can_transition_to(QueryStatus::Completed));
        self.status = QueryStatus::Completed;
        self.error = None;
    }

    /// Marks the query failed. An empty message is replaced so failed queries always carry text.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        debug_assert!(self.status.can_transition_to(QueryStatus::Failed));
        let error = error.into();
        self.status = QueryStatus::Failed;
        self.error = Some(if error.trim().is_empty() {
            "Unknown error".to_string()
        } else {
            error
        });
    }
}
