//! Paper search services.
//!
//! A [`SearchService`] turns one field-prefixed query into candidate papers.
//! Implementations make exactly one request per call; throttling and retry
//! are applied by the caller through [`crate::resilience::CallGuard`].

pub mod arxiv;

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SearchConfig;
use crate::models::CandidatePaper;
use crate::resilience::Retryable;

pub use arxiv::ArxivClient;

/// Sort key understood by the search service.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    #[default]
    Relevance,
    LastUpdatedDate,
    SubmittedDate,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Relevance => "relevance",
            SortBy::LastUpdatedDate => "lastUpdatedDate",
            SortBy::SubmittedDate => "submittedDate",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ascending",
            SortOrder::Descending => "descending",
        }
    }
}

/// Inclusive submission-date bounds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Returns `None` when `from` is after `to`.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Option<Self> {
        (from <= to).then_some(Self { from, to })
    }
}

/// Per-run search settings shared by every query of the run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    #[serde(default)]
    pub date_range: Option<DateRange>,
    pub max_results: u32,
    #[serde(default)]
    pub sort_by: SortBy,
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            date_range: None,
            max_results: 100,
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
        }
    }
}

impl SearchOptions {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            date_range: None,
            max_results: config.max_results,
            sort_by: config.sort_by,
            sort_order: config.sort_order,
        }
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }
}

/// One call to a search service.
#[derive(Debug, Clone, Copy)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
    pub options: &'a SearchOptions,
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Search service rate limited the request")]
    RateLimited,

    #[error("Search service returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Search request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to parse search response: {0}")]
    Parse(String),

    #[error("Search service rejected the query: {0}")]
    Api(String),

    #[error("Invalid search request: {0}")]
    InvalidRequest(String),
}

impl SearchError {
    /// Rate limiting, server errors, timeouts and transport failures may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            SearchError::RateLimited | SearchError::Transport(_) | SearchError::Timeout(_) => true,
            SearchError::Http { status, .. } => *status >= 500,
            SearchError::Parse(_) | SearchError::Api(_) | SearchError::InvalidRequest(_) => false,
        }
    }
}

impl Retryable for SearchError {
    fn is_retryable(&self) -> bool {
        SearchError::is_retryable(self)
    }

    fn timed_out(after: Duration) -> Self {
        SearchError::Timeout(after)
    }
}

/// A source of candidate papers.
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Executes one query and returns its candidates in service order.
    async fn search(&self, request: SearchRequest<'_>) -> Result<Vec<CandidatePaper>, SearchError>;

    /// Tag stored as the paper's source, e.g. `arxiv`.
    fn name(&self) -> &str;
}
