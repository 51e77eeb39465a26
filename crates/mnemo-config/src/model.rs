// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Mnemo memory engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Mnemo configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to documented values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MnemoConfig {
    /// Canonical storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Embedding provider settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Hybrid retrieval and rerank settings.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Result cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Near-duplicate merge settings.
    #[serde(default)]
    pub dedup: DedupConfig,

    /// Session manager and lock settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Retention sweep settings.
    #[serde(default)]
    pub retention: RetentionConfig,
}

/// Canonical storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable write-ahead-log journaling.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    "mnemo.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Embedding provider configuration.
///
/// Selection policy: `primary` when configured, then `secondary`, then the
/// built-in deterministic local fallback (`provider_id = "local-fallback"`).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingConfig {
    /// Fixed output dimensionality for the deployment.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Maximum concurrent embed calls per batch (respects upstream rate
    /// limits and cost).
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// Per-call timeout for embedding providers, in seconds.
    #[serde(default = "default_embed_timeout_secs")]
    pub timeout_secs: u64,

    /// Primary real embedding model. `None` skips straight to `secondary`.
    #[serde(default)]
    pub primary: Option<RemoteEmbeddingConfig>,

    /// Secondary real embedding model, tried when the primary fails.
    #[serde(default)]
    pub secondary: Option<RemoteEmbeddingConfig>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimensions: default_dimensions(),
            parallelism: default_parallelism(),
            timeout_secs: default_embed_timeout_secs(),
            primary: None,
            secondary: None,
        }
    }
}

fn default_dimensions() -> usize {
    384
}

fn default_parallelism() -> usize {
    2
}

fn default_embed_timeout_secs() -> u64 {
    10
}

/// One remote embedding model endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteEmbeddingConfig {
    /// Stable model identity, baked into records and cache keys.
    pub provider_id: String,

    /// HTTP endpoint accepting `{"input": [..]}` and returning
    /// `{"embeddings": [[..]]}`.
    pub endpoint: String,

    /// Bearer token, if the endpoint requires one.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Hybrid retrieval configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetrievalConfig {
    /// Weight of the vector cosine score in fusion.
    #[serde(default = "default_vector_weight")]
    pub vector_weight: f32,

    /// Weight of the normalized lexical score in fusion.
    #[serde(default = "default_lexical_weight")]
    pub lexical_weight: f32,

    /// Result count when the caller does not specify `k`.
    #[serde(default = "default_k")]
    pub default_k: usize,

    /// Candidate pool size fetched per scoring side before fusion.
    #[serde(default = "default_candidate_pool")]
    pub candidate_pool: usize,

    /// Enable the optional rerank pass when a provider is wired in.
    #[serde(default)]
    pub rerank_enabled: bool,

    /// Rerank call budget in milliseconds; on expiry the hybrid order is
    /// kept as-is.
    #[serde(default = "default_rerank_timeout_ms")]
    pub rerank_timeout_ms: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            vector_weight: default_vector_weight(),
            lexical_weight: default_lexical_weight(),
            default_k: default_k(),
            candidate_pool: default_candidate_pool(),
            rerank_enabled: false,
            rerank_timeout_ms: default_rerank_timeout_ms(),
        }
    }
}

fn default_vector_weight() -> f32 {
    0.7
}

fn default_lexical_weight() -> f32 {
    0.3
}

fn default_k() -> usize {
    8
}

fn default_candidate_pool() -> usize {
    50
}

fn default_rerank_timeout_ms() -> u64 {
    500
}

/// Result cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Enable the content-free result cache.
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// Entry lifetime in seconds. Keep it short: new ingests become
    /// visible once the entry expires.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_ttl_secs() -> u64 {
    300
}

/// Near-duplicate merge configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DedupConfig {
    /// Cosine similarity at or above which a new ingest merges into an
    /// existing record instead of inserting.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// How many of the owner's most recent records to compare against.
    #[serde(default = "default_lookback")]
    pub lookback: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            lookback: default_lookback(),
        }
    }
}

fn default_similarity_threshold() -> f32 {
    0.90
}

fn default_lookback() -> usize {
    50
}

/// Session manager configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Lease lifetime for the session-creation lock, in seconds.
    #[serde(default = "default_lock_ttl_secs")]
    pub lock_ttl_secs: u64,

    /// Acquisition attempts before falling back to a read-only lookup.
    #[serde(default = "default_lock_retry_attempts")]
    pub lock_retry_attempts: u32,

    /// Delay between acquisition attempts, in milliseconds.
    #[serde(default = "default_lock_retry_delay_ms")]
    pub lock_retry_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lock_ttl_secs: default_lock_ttl_secs(),
            lock_retry_attempts: default_lock_retry_attempts(),
            lock_retry_delay_ms: default_lock_retry_delay_ms(),
        }
    }
}

fn default_lock_ttl_secs() -> u64 {
    10
}

fn default_lock_retry_attempts() -> u32 {
    3
}

fn default_lock_retry_delay_ms() -> u64 {
    50
}

/// Retention sweep configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    /// Records and idle sessions older than this many days are erased by
    /// the periodic sweep.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Interval between scheduled sweeps, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_retention_days() -> u32 {
    180
}

fn default_sweep_interval_secs() -> u64 {
    3600
}
