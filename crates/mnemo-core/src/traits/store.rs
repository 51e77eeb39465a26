// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter traits for memory records and sessions.

use async_trait::async_trait;

use crate::error::MnemoError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    MemoryRecord, RetrievalFilters, ScoredCandidate, Session, TimeRange,
};

/// Adapter over a memory-record backend, polymorphic over the
/// `{persist, query, delete}` capability set.
///
/// Exactly one instance in a deployment is canonical (authoritative for
/// replay and audit); the rest are best-effort mirrors. That distinction is
/// enforced structurally by the orchestrator's adapter set at construction
/// time, not by this trait.
///
/// All mutations are idempotent upserts or merges so concurrent writers
/// remain safe without locking.
#[async_trait]
pub trait MemoryStoreAdapter: PluginAdapter {
    /// Insert or replace a record by id.
    async fn persist(&self, record: &MemoryRecord) -> Result<(), MnemoError>;

    /// Merge a near-duplicate ingest into an existing record: bump its
    /// occurrence count and extend `last_seen_at`.
    async fn merge_occurrence(
        &self,
        record_id: &str,
        last_seen_at: &str,
    ) -> Result<(), MnemoError>;

    /// Fetch one record by id.
    async fn get(&self, record_id: &str) -> Result<Option<MemoryRecord>, MnemoError>;

    /// Batch fetch by id, used to rehydrate content-free cache hits.
    /// Missing ids are silently absent from the result.
    async fn get_many(&self, record_ids: &[String]) -> Result<Vec<MemoryRecord>, MnemoError>;

    /// The owner's most recent records, newest first, serving as the dedup
    /// window.
    async fn recent(&self, owner_id: &str, limit: usize) -> Result<Vec<MemoryRecord>, MnemoError>;

    /// Unified candidate query, restricted to `owner_id` at the backend
    /// layer: a candidate outside the owner scope must never appear,
    /// regardless of score. Returns up to `k` candidates per scoring side,
    /// composed from vector and lexical passes when the backend cannot fuse
    /// natively.
    async fn query(
        &self,
        owner_id: &str,
        vector: &[f32],
        lexical_query: &str,
        k: usize,
        filters: &RetrievalFilters,
    ) -> Result<Vec<ScoredCandidate>, MnemoError>;

    /// Records created within `range` for one session, oldest first.
    /// Used by backfill to re-embed after a model or redaction-rule change.
    async fn records_for_session(
        &self,
        session_id: &str,
        range: &TimeRange,
    ) -> Result<Vec<MemoryRecord>, MnemoError>;

    /// Rewrite a record's redacted text, embedding, and provider identity
    /// in place. Only backfill uses this; normal ingestion is append-only.
    async fn update_embedding(
        &self,
        record_id: &str,
        redacted_text: &str,
        embedding: &[f32],
        provider_id: &str,
    ) -> Result<(), MnemoError>;

    /// Delete one record. Deleting an absent record is a no-op.
    async fn delete(&self, record_id: &str) -> Result<(), MnemoError>;

    /// Delete every record belonging to an owner. Returns the number removed.
    async fn delete_owner(&self, owner_id: &str) -> Result<u64, MnemoError>;

    /// Delete records created before `cutoff` (RFC 3339). Idempotent:
    /// a second run over the same cutoff removes nothing and is not an
    /// error. Returns the number removed.
    async fn delete_older_than(&self, cutoff: &str) -> Result<u64, MnemoError>;
}

/// Session persistence, implemented by the canonical store only.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// The active (not ended) session for `(owner_id, kind)`, if any.
    async fn active_session(
        &self,
        owner_id: &str,
        kind: &str,
    ) -> Result<Option<Session>, MnemoError>;

    /// Fetch a session by id, active or ended.
    async fn get_session(&self, id: &str) -> Result<Option<Session>, MnemoError>;

    /// Create a new session row.
    async fn create_session(&self, session: &Session) -> Result<(), MnemoError>;

    /// Bump a session's `last_active_at`.
    async fn touch_session(&self, id: &str, last_active_at: &str) -> Result<(), MnemoError>;

    /// End a session, returning its `(owner_id, kind)` pair to the
    /// no-session state.
    async fn end_session(&self, id: &str) -> Result<(), MnemoError>;

    /// Remove all sessions for an owner. Returns the number removed.
    async fn delete_owner_sessions(&self, owner_id: &str) -> Result<u64, MnemoError>;

    /// Remove sessions whose `last_active_at` predates `cutoff`.
    /// Idempotent, like the record sweep. Returns the number removed.
    async fn delete_sessions_idle_before(&self, cutoff: &str) -> Result<u64, MnemoError>;
}
