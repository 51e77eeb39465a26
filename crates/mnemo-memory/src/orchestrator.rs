// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The orchestrator: the engine's single caller-facing surface.
//!
//! Failure policy, uniformly applied:
//! - canonical storage and redaction failures are fatal to the operation
//! - embedding failures retry, then fall to the deterministic local layer
//! - mirrors, the reranker, and the cache only ever degrade the result
//!
//! Mirror writes are detached tasks; the ingestion path never waits on a
//! best-effort backend.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use mnemo_config::model::MnemoConfig;
use mnemo_core::retry::retry_with_backoff;
use mnemo_core::types::{
    EmbeddingInput, HealthStatus, MemoryRecord, RetrievalFilters, RetrievalResult,
    RetrievedRecord, Session, TimeRange, Turn,
};
use mnemo_core::{
    DistributedLock, EmbeddingProvider, EphemeralCache, MemoryStoreAdapter, MnemoError,
    RerankProvider, SessionStore,
};
use mnemo_security::PiiRedactor;

use crate::cache::ResultCache;
use crate::dedup::{DedupDecision, Deduplicator};
use crate::rerank::RerankStage;
use crate::retention::{ErasureReport, RetentionManager, SweepReport};
use crate::retriever::HybridRetriever;
use crate::session::SessionManager;

const EMBED_RETRY_ATTEMPTS: u32 = 3;
const EMBED_RETRY_BASE_DELAY: std::time::Duration = std::time::Duration::from_millis(100);

/// The canonical store plus any number of best-effort mirrors.
///
/// Canonical-vs-mirror is fixed here at construction time; no adapter
/// self-identifies as canonical.
pub struct AdapterSet {
    pub canonical: Arc<dyn MemoryStoreAdapter>,
    pub mirrors: Vec<Arc<dyn MemoryStoreAdapter>>,
}

impl AdapterSet {
    pub fn new(canonical: Arc<dyn MemoryStoreAdapter>) -> Self {
        Self {
            canonical,
            mirrors: Vec::new(),
        }
    }

    pub fn with_mirror(mut self, mirror: Arc<dyn MemoryStoreAdapter>) -> Self {
        self.mirrors.push(mirror);
        self
    }
}

/// Result of committing one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    /// The record the turn landed in: a fresh insert or the merge target.
    pub record_id: String,
    /// Whether the turn merged into an existing record.
    pub merged: bool,
}

/// The memory engine façade.
pub struct MemoryOrchestrator {
    canonical: Arc<dyn MemoryStoreAdapter>,
    mirrors: Vec<Arc<dyn MemoryStoreAdapter>>,
    sessions: Arc<dyn SessionStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    redactor: PiiRedactor,
    retriever: HybridRetriever,
    rerank: RerankStage,
    cache: ResultCache,
    dedup: Deduplicator,
    session_mgr: SessionManager,
    retention: Arc<RetentionManager>,
    default_k: usize,
}

impl MemoryOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &MnemoConfig,
        adapters: AdapterSet,
        sessions: Arc<dyn SessionStore>,
        lock: Arc<dyn DistributedLock>,
        embedder: Arc<dyn EmbeddingProvider>,
        rerank: Option<Arc<dyn RerankProvider>>,
        cache_backend: Option<Arc<dyn EphemeralCache>>,
    ) -> Self {
        let AdapterSet { canonical, mirrors } = adapters;
        let retriever = HybridRetriever::new(Arc::clone(&canonical), config.retrieval.clone());
        let rerank = RerankStage::new(rerank, &config.retrieval);
        let cache = ResultCache::new(cache_backend, &config.cache);
        let dedup = Deduplicator::new(Arc::clone(&canonical), config.dedup.clone());
        let session_mgr =
            SessionManager::new(Arc::clone(&sessions), lock, config.session.clone());
        let retention = Arc::new(RetentionManager::new(
            Arc::clone(&canonical),
            mirrors.clone(),
            Arc::clone(&sessions),
            config.retention.clone(),
        ));

        Self {
            canonical,
            mirrors,
            sessions,
            embedder,
            redactor: PiiRedactor::new(),
            retriever,
            rerank,
            cache,
            dedup,
            session_mgr,
            retention,
            default_k: config.retrieval.default_k,
        }
    }

    /// Ingest one committed turn: redact, embed, dedup, persist.
    ///
    /// Redaction happens first and unconditionally; the raw turn text never
    /// reaches an embedding provider or any store.
    pub async fn on_turn_committed(&self, turn: &Turn) -> Result<IngestOutcome, MnemoError> {
        let redaction = self.redactor.redact(&turn.text);
        if redaction.was_redacted() {
            debug!(turn_id = %turn.id, hits = redaction.hits, "turn text redacted");
        }
        let redacted_text = redaction.text;

        let embedder = Arc::clone(&self.embedder);
        let output = retry_with_backoff(EMBED_RETRY_ATTEMPTS, EMBED_RETRY_BASE_DELAY, || {
            let embedder = Arc::clone(&embedder);
            let text = redacted_text.clone();
            async move {
                embedder
                    .embed(EmbeddingInput { texts: vec![text] })
                    .await
            }
        })
        .await?;
        let vector = output
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| MnemoError::Internal("embedding returned no vectors".to_string()))?;

        let outcome = match self.dedup.decide(&turn.owner_id, &vector).await {
            DedupDecision::Merge(record_id) => {
                self.canonical
                    .merge_occurrence(&record_id, &turn.committed_at)
                    .await?;
                for mirror in &self.mirrors {
                    let mirror = Arc::clone(mirror);
                    let record_id = record_id.clone();
                    let last_seen = turn.committed_at.clone();
                    tokio::spawn(async move {
                        if let Err(err) = mirror.merge_occurrence(&record_id, &last_seen).await {
                            warn!(adapter = mirror.name(), error = %err, "mirror merge failed");
                        }
                    });
                }
                metrics::counter!("mnemo_ingest_merges_total").increment(1);
                IngestOutcome {
                    record_id,
                    merged: true,
                }
            }
            DedupDecision::Insert => {
                let record = MemoryRecord {
                    id: Uuid::new_v4().to_string(),
                    owner_id: turn.owner_id.clone(),
                    session_id: turn.session_id.clone(),
                    redacted_text,
                    embedding: vector,
                    provider_id: output.provider_id,
                    occurrences: 1,
                    metadata: turn.metadata.clone(),
                    created_at: turn.committed_at.clone(),
                    last_seen_at: turn.committed_at.clone(),
                    source_turn_id: turn.id.clone(),
                };
                self.canonical.persist(&record).await?;
                self.mirror_persist(&record);
                metrics::counter!("mnemo_ingest_inserts_total").increment(1);
                IngestOutcome {
                    record_id: record.id,
                    merged: false,
                }
            }
        };

        // Activity bump; losing it only skews idle-session sweeps.
        if let Err(err) = self
            .sessions
            .touch_session(&turn.session_id, &turn.committed_at)
            .await
        {
            warn!(session_id = %turn.session_id, error = %err, "session touch failed");
        }

        Ok(outcome)
    }

    /// Retrieve context for a query: cache, hybrid retrieval, optional
    /// rerank. Hits always carry text rehydrated from canonical storage.
    pub async fn fetch_context(
        &self,
        owner_id: &str,
        query_text: &str,
        k: Option<usize>,
        filters: &RetrievalFilters,
    ) -> Result<RetrievalResult, MnemoError> {
        let k = k.unwrap_or(self.default_k);
        let query = self.redactor.redact(query_text).text;

        let query_embedding = self.embedder.embed_query(&query).await?;
        let cache_key =
            ResultCache::key(owner_id, &query, k, filters, &query_embedding.provider_id);

        if let Some(cached) = self.cache.get(&cache_key).await {
            metrics::counter!("mnemo_retrieval_cache_hits_total").increment(1);
            let ids: Vec<String> = cached.iter().map(|h| h.record_id.clone()).collect();
            let records = self.canonical.get_many(&ids).await?;
            let hits = rehydrate(cached, records);
            return Ok(RetrievalResult {
                hits,
                degraded: false,
                from_cache: true,
            });
        }

        let hits = self
            .retriever
            .retrieve(owner_id, &query, &query_embedding.vector, k, filters)
            .await?;
        let (hits, degraded) = self.rerank.apply(&query, hits).await;

        if degraded {
            metrics::counter!("mnemo_retrieval_degraded_total").increment(1);
        } else {
            // A degraded order is not worth pinning for a TTL.
            self.cache.put(&cache_key, &hits).await;
        }

        Ok(RetrievalResult {
            hits,
            degraded,
            from_cache: false,
        })
    }

    /// The active session for `(owner_id, kind)`, created if absent.
    pub async fn get_or_create_session(
        &self,
        owner_id: &str,
        kind: &str,
    ) -> Result<Session, MnemoError> {
        self.session_mgr.get_or_create(owner_id, kind).await
    }

    /// Re-push a session's canonical records to every mirror, repairing
    /// divergence left by failed detached writes. Persist is an idempotent
    /// upsert, so records the mirror already holds are unchanged. Returns
    /// the number of canonical records examined.
    pub async fn sync_session(&self, session_id: &str) -> Result<u64, MnemoError> {
        let records = self
            .canonical
            .records_for_session(session_id, &TimeRange::default())
            .await?;
        let count = records.len() as u64;
        for mirror in &self.mirrors {
            for record in &records {
                if let Err(err) = mirror.persist(record).await {
                    warn!(adapter = mirror.name(), record_id = %record.id, error = %err,
                        "session sync to mirror failed");
                }
            }
        }
        debug!(session_id, count, "session sync complete");
        Ok(count)
    }

    /// End the active session for the pair. Returns the ended id, if any.
    pub async fn reset_session(
        &self,
        owner_id: &str,
        kind: &str,
    ) -> Result<Option<String>, MnemoError> {
        self.session_mgr.reset(owner_id, kind).await
    }

    /// Re-redact and re-embed every record of a session within `range`,
    /// rewriting in place. Returns the number of records rewritten.
    ///
    /// This is the reconciliation path after an embedding-model change or
    /// a redaction-rule update; fallback-embedded records get real vectors
    /// here.
    pub async fn backfill_session(
        &self,
        session_id: &str,
        range: &TimeRange,
    ) -> Result<u64, MnemoError> {
        let records = self.canonical.records_for_session(session_id, range).await?;
        let mut rewritten = 0u64;

        for record in records {
            let redacted = self.redactor.redact(&record.redacted_text).text;

            let embedder = Arc::clone(&self.embedder);
            let output = retry_with_backoff(EMBED_RETRY_ATTEMPTS, EMBED_RETRY_BASE_DELAY, || {
                let embedder = Arc::clone(&embedder);
                let text = redacted.clone();
                async move {
                    embedder
                        .embed(EmbeddingInput { texts: vec![text] })
                        .await
                }
            })
            .await?;
            let vector = output.embeddings.into_iter().next().ok_or_else(|| {
                MnemoError::Internal("embedding returned no vectors".to_string())
            })?;

            self.canonical
                .update_embedding(&record.id, &redacted, &vector, &output.provider_id)
                .await?;
            for mirror in &self.mirrors {
                let mirror = Arc::clone(mirror);
                let id = record.id.clone();
                let text = redacted.clone();
                let vector = vector.clone();
                let provider = output.provider_id.clone();
                tokio::spawn(async move {
                    if let Err(err) =
                        mirror.update_embedding(&id, &text, &vector, &provider).await
                    {
                        warn!(adapter = mirror.name(), error = %err, "mirror backfill failed");
                    }
                });
            }
            rewritten += 1;
        }

        debug!(session_id, rewritten, "session backfill complete");
        Ok(rewritten)
    }

    /// Erase one owner across records (canonical first, then mirrors) and
    /// sessions. Safe to re-run after a partial failure.
    pub async fn delete_owner_data(&self, owner_id: &str) -> Result<ErasureReport, MnemoError> {
        self.retention.delete_owner(owner_id).await
    }

    /// Run one retention sweep using the configured window.
    pub async fn sweep(&self) -> Result<SweepReport, MnemoError> {
        self.retention.sweep().await
    }

    /// Sweep against an explicit cutoff.
    pub async fn sweep_before(&self, cutoff: &str) -> Result<SweepReport, MnemoError> {
        self.retention.sweep_before(cutoff).await
    }

    /// Spawn the periodic sweep task.
    pub fn spawn_retention_sweeper(&self) -> tokio::task::JoinHandle<()> {
        self.retention.spawn_periodic()
    }

    /// Health of every adapter, canonical first, then mirrors, then the
    /// embedder. Adapters whose check itself errors report unhealthy.
    pub async fn health(&self) -> Vec<(String, HealthStatus)> {
        let mut statuses = Vec::new();
        for adapter in std::iter::once(&self.canonical).chain(self.mirrors.iter()) {
            let status = match adapter.health_check().await {
                Ok(status) => status,
                Err(err) => HealthStatus::Unhealthy(err.to_string()),
            };
            statuses.push((adapter.name().to_string(), status));
        }
        let status = match self.embedder.health_check().await {
            Ok(status) => status,
            Err(err) => HealthStatus::Unhealthy(err.to_string()),
        };
        statuses.push((self.embedder.name().to_string(), status));
        statuses
    }

    /// Shut down adapters. Canonical shutdown errors propagate; mirror
    /// shutdown errors are logged.
    pub async fn shutdown(&self) -> Result<(), MnemoError> {
        for mirror in &self.mirrors {
            if let Err(err) = mirror.shutdown().await {
                warn!(adapter = mirror.name(), error = %err, "mirror shutdown failed");
            }
        }
        self.embedder.shutdown().await?;
        self.canonical.shutdown().await
    }

    fn mirror_persist(&self, record: &MemoryRecord) {
        for mirror in &self.mirrors {
            let mirror = Arc::clone(mirror);
            let record = record.clone();
            tokio::spawn(async move {
                if let Err(err) = mirror.persist(&record).await {
                    warn!(adapter = mirror.name(), error = %err, "mirror persist failed");
                }
            });
        }
    }
}

/// Rebuild hits from cached `{id, score}` pairs and the records fetched
/// for them, preserving cached order. Records deleted since the entry was
/// written are simply absent, so erased content cannot resurface.
fn rehydrate(
    cached: Vec<mnemo_core::types::CachedHit>,
    records: Vec<MemoryRecord>,
) -> Vec<RetrievedRecord> {
    let mut by_id: std::collections::HashMap<String, MemoryRecord> = records
        .into_iter()
        .map(|r| (r.id.clone(), r))
        .collect();
    cached
        .into_iter()
        .filter_map(|hit| by_id.remove(&hit.record_id).map(|record| (record, hit.score)))
        .enumerate()
        .map(|(rank, (record, score))| RetrievedRecord {
            record,
            score,
            rank,
        })
        .collect()
}
