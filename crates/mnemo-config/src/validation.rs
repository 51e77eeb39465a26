// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as weight sums, threshold ranges, and nonzero sizes.

use crate::diagnostic::ConfigError;
use crate::model::MnemoConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &MnemoConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.embedding.dimensions == 0 {
        errors.push(ConfigError::Validation {
            message: "embedding.dimensions must be at least 1".to_string(),
        });
    }

    if config.embedding.parallelism == 0 {
        errors.push(ConfigError::Validation {
            message: "embedding.parallelism must be at least 1".to_string(),
        });
    }

    for (weight, name) in [
        (config.retrieval.vector_weight, "retrieval.vector_weight"),
        (config.retrieval.lexical_weight, "retrieval.lexical_weight"),
    ] {
        if !(0.0..=1.0).contains(&weight) {
            errors.push(ConfigError::Validation {
                message: format!("{name} must be in [0.0, 1.0], got {weight}"),
            });
        }
    }

    let weight_sum = config.retrieval.vector_weight + config.retrieval.lexical_weight;
    if (weight_sum - 1.0).abs() > 1e-4 {
        errors.push(ConfigError::Validation {
            message: format!(
                "retrieval.vector_weight + retrieval.lexical_weight must sum to 1.0, got {weight_sum}"
            ),
        });
    }

    if config.retrieval.default_k == 0 {
        errors.push(ConfigError::Validation {
            message: "retrieval.default_k must be at least 1".to_string(),
        });
    }

    if config.retrieval.candidate_pool < config.retrieval.default_k {
        errors.push(ConfigError::Validation {
            message: format!(
                "retrieval.candidate_pool ({}) must be at least retrieval.default_k ({})",
                config.retrieval.candidate_pool, config.retrieval.default_k
            ),
        });
    }

    if !(0.0..=1.0).contains(&config.dedup.similarity_threshold) {
        errors.push(ConfigError::Validation {
            message: format!(
                "dedup.similarity_threshold must be in [0.0, 1.0], got {}",
                config.dedup.similarity_threshold
            ),
        });
    }

    if config.retention.retention_days == 0 {
        errors.push(ConfigError::Validation {
            message: "retention.retention_days must be at least 1".to_string(),
        });
    }

    if config.session.lock_retry_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "session.lock_retry_attempts must be at least 1".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = MnemoConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = MnemoConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))));
    }

    #[test]
    fn weights_must_sum_to_one() {
        let mut config = MnemoConfig::default();
        config.retrieval.vector_weight = 0.9;
        config.retrieval.lexical_weight = 0.3;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("sum to 1.0"))));
    }

    #[test]
    fn threshold_out_of_range_fails() {
        let mut config = MnemoConfig::default();
        config.dedup.similarity_threshold = 1.5;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("similarity_threshold"))));
    }

    #[test]
    fn zero_retention_fails() {
        let mut config = MnemoConfig::default();
        config.retention.retention_days = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("retention_days"))));
    }

    #[test]
    fn collects_multiple_errors() {
        let mut config = MnemoConfig::default();
        config.storage.database_path = "".to_string();
        config.embedding.dimensions = 0;
        config.retrieval.default_k = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 3);
    }

    #[test]
    fn custom_valid_weights_pass() {
        let mut config = MnemoConfig::default();
        config.retrieval.vector_weight = 0.5;
        config.retrieval.lexical_weight = 0.5;
        assert!(validate_config(&config).is_ok());
    }
}
