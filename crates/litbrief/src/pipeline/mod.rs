pub mod context;
pub mod dedup;
pub mod error;
pub mod executor;
pub mod generator;
pub mod persist;
pub mod progress;
pub mod runner;
pub mod scorer;

pub use context::{RunContext, RunPhase, RunSummary};
pub use dedup::deduplicate;
pub use error::{
    GenerationError, PersistenceError, PipelineError, QueryExecutionError, ScoringError,
};
pub use executor::{ExecutionReport, SearchExecutor};
pub use generator::QueryGenerator;
pub use persist::{PersistFailure, PersistReport, PersistedPaper, PersistenceLayer};
pub use progress::{BroadcastProgress, CollectingProgress, NoopProgress, ProgressReporter, RunEvent};
pub use runner::{Orchestrator, RunRequest};
pub use scorer::{BatchOutcome, BatchStatus, RelevancyScorer, ScoringReport, ScoringTarget};
