//! Table-driven tests for configuration loading and validation.

use std::path::Path;

use litbrief::config::load_config_from_str;
use litbrief::load_config;
use litbrief::search::{SortBy, SortOrder};

/// Represents a single config loading test case.
struct ConfigTestCase {
    name: &'static str,
    config_json: &'static str,
    should_succeed: bool,
    /// Expected error substring (if should_succeed is false).
    expected_error: Option<&'static str>,
}

const CONFIG_TESTS: &[ConfigTestCase] = &[
    ConfigTestCase {
        name: "valid_minimal",
        config_json: r#"{ "version": "1.0" }"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "valid_partial_sections",
        config_json: r#"{
            "version": "1.0",
            "search": { "max_results": 25 },
            "scoring": { "batch_count": 2 }
        }"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "unsupported_version",
        config_json: r#"{ "version": "2.0" }"#,
        should_succeed: false,
        expected_error: Some("Unsupported config version"),
    },
    ConfigTestCase {
        name: "max_results_zero",
        config_json: r#"{ "version": "1.0", "search": { "max_results": 0 } }"#,
        should_succeed: false,
        expected_error: Some("search.max_results"),
    },
    ConfigTestCase {
        name: "max_results_above_limit",
        config_json: r#"{ "version": "1.0", "search": { "max_results": 5000 } }"#,
        should_succeed: false,
        expected_error: Some("search.max_results"),
    },
    ConfigTestCase {
        name: "search_interval_zero",
        config_json: r#"{ "version": "1.0", "search": { "min_interval_ms": 0 } }"#,
        should_succeed: false,
        expected_error: Some("search.min_interval_ms"),
    },
    ConfigTestCase {
        name: "search_interval_below_floor",
        config_json: r#"{ "version": "1.0", "search": { "min_interval_ms": 1500 } }"#,
        should_succeed: false,
        expected_error: Some("search.min_interval_ms"),
    },
    ConfigTestCase {
        name: "search_interval_above_floor",
        config_json: r#"{ "version": "1.0", "search": { "min_interval_ms": 4000 } }"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "search_timeout_zero",
        config_json: r#"{ "version": "1.0", "search": { "timeout_secs": 0 } }"#,
        should_succeed: false,
        expected_error: Some("search.timeout_secs"),
    },
    ConfigTestCase {
        name: "llm_timeout_zero",
        config_json: r#"{ "version": "1.0", "llm": { "timeout_secs": 0 } }"#,
        should_succeed: false,
        expected_error: Some("llm.timeout_secs"),
    },
    ConfigTestCase {
        name: "retry_without_attempts",
        config_json: r#"{ "version": "1.0", "retry": { "max_attempts": 0 } }"#,
        should_succeed: false,
        expected_error: Some("retry.max_attempts"),
    },
    ConfigTestCase {
        name: "retry_base_delay_above_max",
        config_json: r#"{ "version": "1.0", "retry": { "base_delay_ms": 5000, "max_delay_ms": 100 } }"#,
        should_succeed: false,
        expected_error: Some("retry.base_delay_ms"),
    },
    ConfigTestCase {
        name: "temperature_out_of_range",
        config_json: r#"{ "version": "1.0", "llm": { "temperature": 3.5 } }"#,
        should_succeed: false,
        expected_error: Some("llm.temperature"),
    },
    ConfigTestCase {
        name: "zero_scoring_batches",
        config_json: r#"{ "version": "1.0", "scoring": { "batch_count": 0 } }"#,
        should_succeed: false,
        expected_error: Some("scoring.batch_count"),
    },
    ConfigTestCase {
        name: "unknown_sort_key",
        config_json: r#"{ "version": "1.0", "search": { "sort_by": "citations" } }"#,
        should_succeed: false,
        expected_error: Some("parse config JSON"),
    },
    ConfigTestCase {
        name: "malformed_json",
        config_json: r#"{ "version": "1.0", "#,
        should_succeed: false,
        expected_error: Some("parse config JSON"),
    },
];

#[test]
fn test_config_table() {
    for case in CONFIG_TESTS {
        let result = load_config_from_str(case.config_json);
        if case.should_succeed {
            assert!(
                result.is_ok(),
                "[{}] expected success, got {:?}",
                case.name,
                result.err()
            );
        } else {
            let err = result.expect_err(case.name).to_string();
            if let Some(expected) = case.expected_error {
                assert!(
                    err.contains(expected),
                    "[{}] expected error containing '{}', got '{}'",
                    case.name,
                    expected,
                    err
                );
            }
        }
    }
}

#[test]
fn test_defaults_match_documented_values() {
    let config = load_config_from_str(r#"{ "version": "1.0" }"#).unwrap();
    assert_eq!(config.search.min_interval_ms, 3000);
    assert_eq!(config.search.max_results, 100);
    assert_eq!(config.search.sort_by, SortBy::Relevance);
    assert_eq!(config.search.sort_order, SortOrder::Descending);
    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.generation.max_queries, 3);
    assert_eq!(config.scoring.batch_count, 4);
    assert_eq!(config.llm.api_key_env.as_deref(), Some("OPENAI_API_KEY"));
    assert!(config.database.path.is_none());
}

#[test]
fn test_load_fixture_file() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/litbrief.json");
    let config = load_config(&path).unwrap();

    assert_eq!(config.search.max_results, 50);
    assert_eq!(config.search.sort_by, SortBy::SubmittedDate);
    assert_eq!(config.llm.model, "llama3.1");
    assert_eq!(config.llm.temperature, Some(0.2));
    assert_eq!(config.generation.max_queries, 5);
    assert!(config.logging.json);
    assert_eq!(
        config.database.path.as_deref(),
        Some(Path::new("/tmp/litbrief/litbrief.db"))
    );
}

#[test]
fn test_missing_file_reports_path() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("absent.json");
    let err = load_config(&path).unwrap_err().to_string();
    assert!(err.contains("absent.json"));
}
