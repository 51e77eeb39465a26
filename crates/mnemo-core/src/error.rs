// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Mnemo memory engine.

use thiserror::Error;

/// The primary error type used across all Mnemo adapter traits and core operations.
///
/// Components return this type directly; the orchestrator translates it at
/// its boundary into fatal-ingestion, degraded-retrieval, or transient
/// behavior so raw provider errors never cross into caller code.
#[derive(Debug, Error)]
pub enum MnemoError {
    /// Configuration errors (invalid TOML, missing required fields, bad ranges).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Embedding or rerank provider errors (API failure, bad response shape).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// PII redaction failure. Always fatal for ingestion: unredacted text
    /// must never reach storage or an embedding provider.
    #[error("redaction error: {0}")]
    Redaction(String),

    /// A distributed lock could not be acquired within the retry budget.
    #[error("lock contended: {key}")]
    LockContended { key: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MnemoError {
    /// Whether a bounded retry is worth attempting for this error.
    ///
    /// Timeouts and provider failures are transient by taxonomy; storage,
    /// config, and redaction errors are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MnemoError::Timeout { .. } | MnemoError::Provider { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_are_stable() {
        let err = MnemoError::Config("missing section".into());
        assert_eq!(err.to_string(), "configuration error: missing section");

        let err = MnemoError::LockContended {
            key: "session:owner-a:travel".into(),
        };
        assert_eq!(err.to_string(), "lock contended: session:owner-a:travel");
    }

    #[test]
    fn transient_classification() {
        assert!(MnemoError::Timeout {
            duration: std::time::Duration::from_secs(1)
        }
        .is_transient());
        assert!(MnemoError::Provider {
            message: "503".into(),
            source: None
        }
        .is_transient());
        assert!(!MnemoError::Redaction("bad pattern".into()).is_transient());
        assert!(!MnemoError::Storage {
            source: Box::new(std::io::Error::other("disk"))
        }
        .is_transient());
    }
}
