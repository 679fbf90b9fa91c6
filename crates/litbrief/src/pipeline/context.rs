use serde::Serialize;

use crate::models::{CandidatePaper, QueryStatus, SearchQuery};
use crate::search::SearchOptions;

use super::persist::{PersistFailure, PersistReport};
use super::scorer::ScoringReport;

/// Where a run currently is. Carried by [`RunContext`] and reported on every change.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "phase", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum RunPhase {
    Pending,
    Searching { total_queries: usize },
    Deduplicating { candidates: usize },
    Persisting { unique: usize },
    Scoring { papers: usize, batches: usize },
    Completed,
    Cancelled,
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Completed | RunPhase::Cancelled)
    }
}

/// State threaded through the stages of one run.
pub struct RunContext {
    // Input
    pub run_id: String,
    pub brief_id: String,
    pub question: String,
    pub options: SearchOptions,
    pub queries: Vec<SearchQuery>,

    pub phase: RunPhase,

    // Search result, in dispatch order
    pub candidates: Vec<CandidatePaper>,

    // Dedup result
    pub unique: Vec<CandidatePaper>,

    // Persist result
    pub persisted: PersistReport,

    // Scoring result
    pub scoring: ScoringReport,

    pub cancelled: bool,
}

impl RunContext {
    pub fn new(
        run_id: String,
        brief_id: String,
        question: String,
        options: SearchOptions,
        queries: Vec<SearchQuery>,
    ) -> Self {
        Self {
            run_id,
            brief_id,
            question,
            options,
            queries,
            phase: RunPhase::Pending,
            candidates: Vec::new(),
            unique: Vec::new(),
            persisted: PersistReport::default(),
            scoring: ScoringReport::default(),
            cancelled: false,
        }
    }

    pub fn into_summary(self) -> RunSummary {
        let failed_queries = self
            .queries
            .iter()
            .filter(|q| q.status == QueryStatus::Failed)
            .count();

        RunSummary {
            run_id: self.run_id,
            brief_id: self.brief_id,
            phase: self.phase,
            failed_queries,
            queries: self.queries,
            papers_found: self.candidates.len(),
            unique_papers: self.unique.len(),
            persisted: self.persisted.persisted.len(),
            new_papers: self.persisted.new_papers(),
            persistence_failures: self.persisted.failures,
            scoring: self.scoring,
            cancelled: self.cancelled,
        }
    }
}

/// What the caller sees when a run ends.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: String,
    pub brief_id: String,
    pub phase: RunPhase,
    /// Final state of every query of the run, including unselected ones.
    pub queries: Vec<SearchQuery>,
    pub failed_queries: usize,
    /// Candidates returned across all completed queries, before dedup.
    pub papers_found: usize,
    pub unique_papers: usize,
    pub persisted: usize,
    pub new_papers: usize,
    pub persistence_failures: Vec<PersistFailure>,
    pub scoring: ScoringReport,
    pub cancelled: bool,
}
