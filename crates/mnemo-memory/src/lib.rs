// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Mnemo memory engine: ingestion, hybrid retrieval, deduplication,
//! session management, and retention, composed behind
//! [`orchestrator::MemoryOrchestrator`].
//!
//! The orchestrator is the only surface callers touch. Internally it wires
//! the PII redactor, the embedding provider stack, the hybrid retriever
//! with its optional rerank pass, the content-free result cache, the
//! near-duplicate merger, and the lock-guarded session manager over one
//! canonical store plus any number of best-effort mirrors.

pub mod cache;
pub mod dedup;
pub mod embedder;
pub mod orchestrator;
pub mod rerank;
pub mod retention;
pub mod retriever;
pub mod session;

pub use cache::ResultCache;
pub use dedup::{DedupDecision, Deduplicator};
pub use embedder::{EmbedderStack, HttpEmbeddingProvider, LocalHashEmbedder};
pub use orchestrator::{AdapterSet, IngestOutcome, MemoryOrchestrator};
pub use rerank::RerankStage;
pub use retention::{ErasureReport, RetentionManager, SweepReport};
pub use retriever::HybridRetriever;
pub use session::SessionManager;

/// Current instant as RFC 3339 with millisecond precision, matching the
/// format SQLite's `strftime('%Y-%m-%dT%H:%M:%fZ', 'now')` produces.
pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
