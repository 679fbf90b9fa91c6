use thiserror::Error;

use crate::db::DatabaseError;
use crate::llm::LlmError;
use crate::search::SearchError;

/// Query generation failed. Nothing was mutated.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Research question is empty")]
    EmptyQuestion,

    #[error("Language model call failed: {0}")]
    Model(#[from] LlmError),

    #[error("Language model returned no usable queries")]
    NoQueries,
}

/// One query exhausted its retries. Contained to that query.
#[derive(Error, Debug)]
#[error("Query '{query}' failed: {source}")]
pub struct QueryExecutionError {
    pub query_id: String,
    pub query: String,
    #[source]
    pub source: SearchError,
}

/// One candidate could not be stored. Contained to that candidate.
#[derive(Error, Debug)]
#[error("Failed to persist paper '{external_id}' after {attempts} attempt(s): {source}")]
pub struct PersistenceError {
    pub external_id: String,
    pub attempts: u32,
    #[source]
    pub source: DatabaseError,
}

/// One scoring batch was discarded. Its papers stay unscored.
#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("Language model call failed: {0}")]
    Model(#[from] LlmError),

    #[error("Could not parse scoring response: {0}")]
    Parse(String),
}

/// Errors that end a run or a pipeline request.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Query generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("A run is already in progress for brief '{0}'")]
    RunInProgress(String),

    #[error("Invalid run request: {0}")]
    InvalidRequest(String),

    #[error("Store error: {0}")]
    Store(#[from] DatabaseError),

    #[error("Run registry lock poisoned")]
    LockPoisoned,
}
