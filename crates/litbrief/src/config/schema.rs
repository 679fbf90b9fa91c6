use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::resilience::RetryPolicy;
use crate::search::{SortBy, SortOrder};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            search: SearchConfig::default(),
            retry: RetryConfig::default(),
            llm: LlmConfig::default(),
            generation: GenerationConfig::default(),
            scoring: ScoringConfig::default(),
            persistence: PersistenceConfig::default(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    #[serde(default)]
    pub sort_by: SortBy,
    #[serde(default)]
    pub sort_order: SortOrder,
    /// Minimum delay between two dispatches to the search service.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_search_base_url() -> String {
    "https://export.arxiv.org/api/query".to_string()
}

fn default_max_results() -> u32 {
    100
}

/// Floor on the gap between two search dispatches.
pub const MIN_SEARCH_INTERVAL_MS: u64 = 3000;

fn default_min_interval_ms() -> u64 {
    MIN_SEARCH_INTERVAL_MS
}

fn default_search_timeout_secs() -> u64 {
    30
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_base_url(),
            max_results: default_max_results(),
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
            min_interval_ms: default_min_interval_ms(),
            timeout_secs: default_search_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryConfig {
    /// Builds a retry policy with the given per-attempt timeout.
    pub fn policy(&self, timeout_secs: u64) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            timeout: Some(Duration::from_secs(timeout_secs)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Direct API key. Prefer `api_key_file` or `api_key_env` outside of local testing.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_file: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Minimum delay between two language-model calls. Zero disables throttling.
    #[serde(default)]
    pub min_interval_ms: u64,
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> Option<String> {
    Some("OPENAI_API_KEY".to_string())
}

fn default_llm_timeout_secs() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_model(),
            api_key: None,
            api_key_file: None,
            api_key_env: default_api_key_env(),
            timeout_secs: default_llm_timeout_secs(),
            temperature: None,
            min_interval_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_max_queries")]
    pub max_queries: usize,
}

fn default_max_queries() -> usize {
    3
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_queries: default_max_queries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_batch_count")]
    pub batch_count: usize,
}

fn default_batch_count() -> usize {
    4
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            batch_count: default_batch_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Attempts per candidate unit of work before it is reported as failed.
    #[serde(default = "default_persist_attempts")]
    pub max_attempts: u32,
}

fn default_persist_attempts() -> u32 {
    2
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_persist_attempts(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Falls back to `db::default_database_path()` when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
