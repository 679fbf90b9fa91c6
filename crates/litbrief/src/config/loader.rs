use std::path::Path;

use crate::config::schema::{Config, MIN_SEARCH_INTERVAL_MS};
use crate::error::ConfigError;

/// Upper bound accepted by the arXiv API for a single page.
const MAX_RESULTS_LIMIT: u32 = 2000;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.search.max_results == 0 || config.search.max_results > MAX_RESULTS_LIMIT {
        return Err(ConfigError::Validation {
            message: format!(
                "search.max_results must be between 1 and {}, got {}",
                MAX_RESULTS_LIMIT, config.search.max_results
            ),
        });
    }

    if config.search.base_url.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "search.base_url must not be empty".to_string(),
        });
    }

    if config.search.min_interval_ms < MIN_SEARCH_INTERVAL_MS {
        return Err(ConfigError::Validation {
            message: format!(
                "search.min_interval_ms must be at least {}, got {}",
                MIN_SEARCH_INTERVAL_MS, config.search.min_interval_ms
            ),
        });
    }

    if config.search.timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "search.timeout_secs must be at least 1".to_string(),
        });
    }

    if config.llm.timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "llm.timeout_secs must be at least 1".to_string(),
        });
    }

    if config.retry.max_attempts == 0 {
        return Err(ConfigError::Validation {
            message: "retry.max_attempts must be at least 1".to_string(),
        });
    }

    if config.retry.base_delay_ms > config.retry.max_delay_ms {
        return Err(ConfigError::Validation {
            message: format!(
                "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                config.retry.base_delay_ms, config.retry.max_delay_ms
            ),
        });
    }

    if config.llm.model.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "llm.model must not be empty".to_string(),
        });
    }

    if let Some(t) = config.llm.temperature {
        if !(0.0..=2.0).contains(&t) {
            return Err(ConfigError::Validation {
                message: format!("llm.temperature must be within [0, 2], got {}", t),
            });
        }
    }

    if config.generation.max_queries == 0 {
        return Err(ConfigError::Validation {
            message: "generation.max_queries must be at least 1".to_string(),
        });
    }

    if config.scoring.batch_count == 0 {
        return Err(ConfigError::Validation {
            message: "scoring.batch_count must be at least 1".to_string(),
        });
    }

    if config.persistence.max_attempts == 0 {
        return Err(ConfigError::Validation {
            message: "persistence.max_attempts must be at least 1".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{SortBy, SortOrder};

    #[test]
    fn test_load_minimal_config_uses_defaults() {
        let config = load_config_from_str(r#"{ "version": "1.0" }"#).unwrap();

        assert_eq!(config.search.max_results, 100);
        assert_eq!(config.search.min_interval_ms, 3000);
        assert_eq!(config.search.sort_by, SortBy::Relevance);
        assert_eq!(config.search.sort_order, SortOrder::Descending);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.generation.max_queries, 3);
        assert_eq!(config.scoring.batch_count, 4);
        assert_eq!(config.persistence.max_attempts, 2);
        assert_eq!(config.llm.api_key_env.as_deref(), Some("OPENAI_API_KEY"));
        assert!(config.database.path.is_none());
    }

    #[test]
    fn test_load_full_config() {
        let config_json = r#"
        {
            "version": "1.0",
            "search": {
                "base_url": "http://localhost:9000/api/query",
                "max_results": 50,
                "sort_by": "submittedDate",
                "sort_order": "ascending",
                "min_interval_ms": 5000,
                "timeout_secs": 10
            },
            "retry": { "max_attempts": 5, "base_delay_ms": 200, "max_delay_ms": 2000 },
            "llm": { "model": "local-model", "base_url": "http://localhost:8080/v1", "temperature": 0.2 },
            "generation": { "max_queries": 5 },
            "scoring": { "batch_count": 2 },
            "database": { "path": "/tmp/brief.db" },
            "logging": { "level": "debug", "json": true }
        }
        "#;

        let config = load_config_from_str(config_json).unwrap();
        assert_eq!(config.search.base_url, "http://localhost:9000/api/query");
        assert_eq!(config.search.max_results, 50);
        assert_eq!(config.search.sort_by, SortBy::SubmittedDate);
        assert_eq!(config.search.sort_order, SortOrder::Ascending);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.llm.model, "local-model");
        assert_eq!(config.generation.max_queries, 5);
        assert_eq!(config.scoring.batch_count, 2);
        assert!(config.logging.json);
        assert_eq!(
            config.database.path.as_deref(),
            Some(Path::new("/tmp/brief.db"))
        );
    }

    #[test]
    fn test_reject_unsupported_version() {
        let result = load_config_from_str(r#"{ "version": "2.0" }"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_reject_zero_batch_count() {
        let result = load_config_from_str(r#"{ "version": "1.0", "scoring": { "batch_count": 0 } }"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_reject_out_of_range_max_results() {
        let result =
            load_config_from_str(r#"{ "version": "1.0", "search": { "max_results": 5000 } }"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_reject_inverted_retry_delays() {
        let result = load_config_from_str(
            r#"{ "version": "1.0", "retry": { "base_delay_ms": 5000, "max_delay_ms": 100 } }"#,
        );
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_reject_search_interval_below_floor() {
        for interval in [0, 2999] {
            let json = format!(
                r#"{{ "version": "1.0", "search": {{ "min_interval_ms": {} }} }}"#,
                interval
            );
            assert!(matches!(
                load_config_from_str(&json),
                Err(ConfigError::Validation { ref message }) if message.contains("min_interval_ms")
            ));
        }
        let config =
            load_config_from_str(r#"{ "version": "1.0", "search": { "min_interval_ms": 3000 } }"#)
                .unwrap();
        assert_eq!(config.search.min_interval_ms, 3000);
    }

    #[test]
    fn test_reject_zero_timeouts() {
        for json in [
            r#"{ "version": "1.0", "search": { "timeout_secs": 0 } }"#,
            r#"{ "version": "1.0", "llm": { "timeout_secs": 0 } }"#,
        ] {
            assert!(matches!(
                load_config_from_str(json),
                Err(ConfigError::Validation { ref message }) if message.contains("timeout_secs")
            ));
        }
    }

    #[test]
    fn test_reject_invalid_json() {
        let result = load_config_from_str("{ not json");
        assert!(matches!(result, Err(ConfigError::ParseJson(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config("/definitely/not/here/litbrief.json");
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn test_retry_policy_from_config() {
        let config = Config::default();
        let policy = config.retry.policy(config.search.timeout_secs);
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, std::time::Duration::from_millis(1000));
        assert_eq!(policy.timeout, Some(std::time::Duration::from_secs(30)));
    }
}
