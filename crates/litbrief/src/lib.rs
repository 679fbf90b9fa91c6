pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod resilience;
pub mod search;
pub mod secrets;
pub mod view;

pub use config::{load_config, load_config_from_str, Config};
pub use db::Database;
pub use error::{ConfigError, LitbriefError, Result};
pub use llm::{LanguageModel, LlmError, OpenAiCompatibleClient};
pub use models::{Association, CandidatePaper, Paper, QueryStatus, SearchQuery};
pub use pipeline::{
    BroadcastProgress, NoopProgress, Orchestrator, PipelineError, ProgressReporter, RunEvent,
    RunRequest, RunSummary,
};
pub use resilience::{CallGuard, RateLimiter, RetryPolicy};
pub use search::{ArxivClient, SearchOptions, SearchService};
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError};
pub use view::{BriefPaper, RelevancyBucket, SortDirection, SortKey};
