use serde::{Deserialize, Serialize};

/// Lowest and highest relevancy score an association may carry.
pub const MIN_SCORE: u8 = 0;
pub const MAX_SCORE: u8 = 100;

/// Links one brief to one paper. Unique per (brief_id, paper_id).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Association {
    pub id: i64,
    pub brief_id: String,
    pub paper_id: i64,
    /// Query texts that led to this paper being associated.
    pub query_texts: Vec<String>,
    /// Only changed by explicit user action.
    pub is_selected: bool,
    pub relevancy_score: Option<u8>,
    pub relevancy_justification: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Association {
    pub fn is_scored(&self) -> bool {
        self.relevancy_score.is_some()
    }
}
