// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Mnemo engine.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter behind a [`crate::traits::PluginAdapter`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Embedding,
    Rerank,
    Cache,
    Lock,
}

/// A conversational turn handed to the engine after the surrounding system
/// commits it. The text here is raw: redaction happens inside the engine,
/// strictly before embedding and persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Unique identifier for this turn.
    pub id: String,
    /// Tenant that owns the turn.
    pub owner_id: String,
    /// Session the turn belongs to.
    pub session_id: String,
    /// Raw turn text as produced by the conversation.
    pub text: String,
    /// Free-form metadata carried through to the stored record.
    pub metadata: Option<serde_json::Value>,
    /// RFC 3339 commit timestamp.
    pub committed_at: String,
}

/// A persisted, redacted, embedded unit of conversational content.
///
/// Records are append-only: corrections create new records or merge into
/// existing ones via the deduplicator, never in-place content edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique identifier for this record.
    pub id: String,
    /// Tenant that owns the record. Retrieval never crosses owners.
    pub owner_id: String,
    /// Session the originating turn belonged to.
    pub session_id: String,
    /// Turn text after PII redaction. Never contains matched PII patterns.
    pub redacted_text: String,
    /// Embedding vector with the deployment's fixed dimensionality.
    #[serde(skip)]
    pub embedding: Vec<f32>,
    /// Identity of the embedding provider that produced the vector.
    /// `local-fallback` vectors are not semantically comparable to real
    /// model output and are replaced wholesale via backfill.
    pub provider_id: String,
    /// How many near-duplicate ingests merged into this record.
    pub occurrences: i64,
    /// Free-form metadata from the originating turn.
    pub metadata: Option<serde_json::Value>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 timestamp of the most recent merge (or creation).
    pub last_seen_at: String,
    /// Identifier of the turn this record was created from.
    pub source_turn_id: String,
}

/// A conversation session scoped to one `(owner_id, kind)` pair.
///
/// At most one session per pair is active (no `ended_at`) at a time unless
/// explicitly reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier for this session.
    pub id: String,
    /// Tenant that owns the session.
    pub owner_id: String,
    /// Caller-defined session kind, e.g. `travel-plan`.
    pub kind: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 timestamp of the last activity.
    pub last_active_at: String,
}

/// One retrieval hit with its fused score and final rank.
#[derive(Debug, Clone)]
pub struct RetrievedRecord {
    pub record: MemoryRecord,
    pub score: f32,
    pub rank: usize,
}

/// Ephemeral, ordered retrieval output. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct RetrievalResult {
    /// Hits in rank order, at most `k`.
    pub hits: Vec<RetrievedRecord>,
    /// Set when a best-effort dependency (mirror, reranker, cache) was
    /// unavailable and coverage or quality may be reduced.
    pub degraded: bool,
    /// Set when the hit list came from the result cache. Text is always
    /// rehydrated from canonical storage regardless.
    pub from_cache: bool,
}

impl RetrievalResult {
    /// An empty, non-degraded result. An empty store is not an error.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Content-free cached form of a retrieval hit. Never contains text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedHit {
    pub record_id: String,
    pub score: f32,
    pub chunk_index: u32,
}

/// A candidate returned by a store query, before fusion.
///
/// `lexical_score` is the raw bm25 value when the backend supports keyword
/// search (more negative = more relevant under SQLite FTS5), `None` when it
/// does not.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub id: String,
    pub vector_score: f32,
    pub lexical_score: Option<f64>,
    pub created_at: String,
}

/// Optional narrowing filters for retrieval.
#[derive(Debug, Clone, Default)]
pub struct RetrievalFilters {
    /// Restrict to records from one session.
    pub session_id: Option<String>,
    /// Restrict to records created at or after this RFC 3339 instant.
    pub since: Option<String>,
}

/// Half-open time range used by backfill operations.
#[derive(Debug, Clone, Default)]
pub struct TimeRange {
    pub since: Option<String>,
    pub until: Option<String>,
}

/// Input for an embedding provider.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    pub texts: Vec<String>,
}

/// Output from an embedding provider.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    pub embeddings: Vec<Vec<f32>>,
    pub dimensions: usize,
    /// Identity of the provider that actually produced these vectors.
    pub provider_id: String,
}

/// A query vector tagged with the provider that produced it, so cache keys
/// can incorporate the embedding-model identity.
#[derive(Debug, Clone)]
pub struct QueryEmbedding {
    pub vector: Vec<f32>,
    pub provider_id: String,
}

/// An acquired distributed-lock lease. Release by handing the token back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseToken {
    pub key: String,
    pub token: String,
}

/// Convert an f32 vector to bytes for SQLite BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert a SQLite BLOB back to an f32 vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes(chunk.try_into().unwrap()))
        .collect()
}

/// Compute cosine similarity between two vectors.
///
/// For L2-normalized vectors this is the dot product. Mismatched lengths
/// yield 0.0 rather than panicking: mixed-dimensionality vectors can occur
/// transiently between an embedding-model change and a backfill.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_to_blob_roundtrip() {
        let original = vec![0.1_f32, 0.2, 0.3, -0.5, 1.0];
        let blob = vec_to_blob(&original);
        let recovered = blob_to_vec(&blob);
        assert_eq!(original.len(), recovered.len());
        for (a, b) in original.iter().zip(recovered.iter()) {
            assert!((a - b).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn vec_to_blob_fixed_dim() {
        let vec384: Vec<f32> = (0..384).map(|i| i as f32 / 384.0).collect();
        let blob = vec_to_blob(&vec384);
        assert_eq!(blob.len(), 384 * 4);
        assert_eq!(blob_to_vec(&blob).len(), 384);
    }

    #[test]
    fn cosine_similarity_identical() {
        let v = vec![0.5773_f32, 0.5773, 0.5773];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 0.01, "got {sim}");
    }

    #[test]
    fn cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < f32::EPSILON);
    }

    #[test]
    fn cosine_similarity_opposite() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        let sim = cosine_similarity(&a, &b);
        assert!((sim + 1.0).abs() < f32::EPSILON, "got {sim}");
    }

    #[test]
    fn cosine_similarity_mismatched_lengths_is_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn cosine_similarity_unnormalized_inputs() {
        // Same direction, different magnitudes: still ~1.0.
        let a = vec![3.0, 4.0];
        let b = vec![6.0, 8.0];
        let sim = cosine_similarity(&a, &b);
        assert!((sim - 1.0).abs() < 0.001, "got {sim}");
    }

    #[test]
    fn cached_hit_serializes_content_free() {
        let hit = CachedHit {
            record_id: "rec-1".to_string(),
            score: 0.87,
            chunk_index: 0,
        };
        let json = serde_json::to_string(&hit).unwrap();
        assert!(json.contains("rec-1"));
        // Only identifiers and scores: three fields, no text payload.
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value.as_object().unwrap().len(), 3);
    }

    #[test]
    fn retrieval_result_empty_is_clean() {
        let result = RetrievalResult::empty();
        assert!(result.hits.is_empty());
        assert!(!result.degraded);
        assert!(!result.from_cache);
    }

    #[test]
    fn memory_record_embedding_not_serialized() {
        let record = MemoryRecord {
            id: "r1".to_string(),
            owner_id: "owner-a".to_string(),
            session_id: "s1".to_string(),
            redacted_text: "beach trip".to_string(),
            embedding: vec![0.1; 384],
            provider_id: "local-fallback".to_string(),
            occurrences: 1,
            metadata: None,
            created_at: "2026-03-01T00:00:00Z".to_string(),
            last_seen_at: "2026-03-01T00:00:00Z".to_string(),
            source_turn_id: "t1".to_string(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("embedding"));
    }
}
