// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for configuration loading and validation.

use mnemo_config::{load_and_validate_str, ConfigError, MnemoConfig};

#[test]
fn empty_string_yields_defaults() {
    let config = load_and_validate_str("").unwrap();
    assert_eq!(config.storage.database_path, "mnemo.db");
    assert_eq!(config.retrieval.default_k, 8);
    assert_eq!(config.cache.ttl_secs, 300);
    assert!(config.embedding.primary.is_none());
}

#[test]
fn full_config_round_trip() {
    let toml = r#"
[storage]
database_path = "/var/lib/mnemo/mnemo.db"
wal_mode = true

[embedding]
dimensions = 768
parallelism = 4
timeout_secs = 5

[embedding.primary]
provider_id = "text-embedding-3-small"
endpoint = "https://embeddings.example/v1"
api_key = "sk-test"

[retrieval]
vector_weight = 0.6
lexical_weight = 0.4
default_k = 12
candidate_pool = 100
rerank_enabled = true
rerank_timeout_ms = 250

[cache]
enabled = false
ttl_secs = 60

[dedup]
similarity_threshold = 0.85
lookback = 20

[session]
lock_ttl_secs = 5
lock_retry_attempts = 5
lock_retry_delay_ms = 25

[retention]
retention_days = 90
sweep_interval_secs = 600
"#;
    let config = load_and_validate_str(toml).unwrap();
    assert_eq!(config.storage.database_path, "/var/lib/mnemo/mnemo.db");
    assert_eq!(config.embedding.dimensions, 768);
    assert_eq!(
        config.embedding.primary.as_ref().unwrap().provider_id,
        "text-embedding-3-small"
    );
    assert!((config.retrieval.vector_weight - 0.6).abs() < f32::EPSILON);
    assert!(config.retrieval.rerank_enabled);
    assert!(!config.cache.enabled);
    assert_eq!(config.dedup.lookback, 20);
    assert_eq!(config.session.lock_retry_attempts, 5);
    assert_eq!(config.retention.retention_days, 90);
}

#[test]
fn unknown_key_is_rejected_with_suggestion() {
    let toml = r#"
[retention]
retension_days = 30
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(!errors.is_empty());
    let has_suggestion = errors.iter().any(|e| {
        matches!(
            e,
            ConfigError::UnknownKey { key, suggestion, .. }
                if key == "retension_days"
                    && suggestion.as_deref() == Some("retention_days")
        )
    });
    assert!(has_suggestion, "expected unknown-key suggestion, got: {errors:?}");
}

#[test]
fn unknown_section_is_rejected() {
    let toml = r#"
[telemetry]
enabled = true
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::UnknownKey { key, .. } if key == "telemetry")));
}

#[test]
fn semantic_validation_runs_after_parse() {
    let toml = r#"
[retrieval]
vector_weight = 0.9
lexical_weight = 0.3
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("sum to 1.0"))));
}

#[test]
fn candidate_pool_smaller_than_k_fails() {
    let toml = r#"
[retrieval]
default_k = 20
candidate_pool = 10
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("candidate_pool"))));
}

#[test]
fn default_config_is_serializable() {
    let config = MnemoConfig::default();
    let serialized = toml::to_string(&config).unwrap();
    let reparsed = load_and_validate_str(&serialized).unwrap();
    assert_eq!(reparsed.retrieval.default_k, config.retrieval.default_k);
}
