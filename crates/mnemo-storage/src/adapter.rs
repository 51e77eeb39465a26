// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the memory-record and session store traits.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use mnemo_config::model::StorageConfig;
use mnemo_core::types::{
    AdapterType, HealthStatus, MemoryRecord, RetrievalFilters, ScoredCandidate, Session,
    TimeRange,
};
use mnemo_core::{MemoryStoreAdapter, MnemoError, PluginAdapter, SessionStore};

use crate::database::Database;
use crate::queries;

/// SQLite-backed canonical store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`SqliteStore::initialize`].
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`] is called.
    ///
    /// [`initialize`]: SqliteStore::initialize
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the database and run migrations.
    pub async fn initialize(&self) -> Result<(), MnemoError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| MnemoError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite store initialized");
        Ok(())
    }

    /// Checkpoint the WAL before shutdown.
    pub async fn close(&self) -> Result<(), MnemoError> {
        self.db()?.close().await
    }

    /// A clone of the database handle, for wiring up the lease lock against
    /// the same file.
    pub fn database(&self) -> Result<Database, MnemoError> {
        self.db().cloned()
    }

    fn db(&self) -> Result<&Database, MnemoError> {
        self.db.get().ok_or_else(|| MnemoError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        if let Some(db) = self.db.get() {
            db.close().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl MemoryStoreAdapter for SqliteStore {
    async fn persist(&self, record: &MemoryRecord) -> Result<(), MnemoError> {
        queries::records::persist(self.db()?, record).await
    }

    async fn merge_occurrence(
        &self,
        record_id: &str,
        last_seen_at: &str,
    ) -> Result<(), MnemoError> {
        queries::records::merge_occurrence(self.db()?, record_id, last_seen_at).await
    }

    async fn get(&self, record_id: &str) -> Result<Option<MemoryRecord>, MnemoError> {
        queries::records::get(self.db()?, record_id).await
    }

    async fn get_many(&self, record_ids: &[String]) -> Result<Vec<MemoryRecord>, MnemoError> {
        queries::records::get_many(self.db()?, record_ids).await
    }

    async fn recent(&self, owner_id: &str, limit: usize) -> Result<Vec<MemoryRecord>, MnemoError> {
        queries::records::recent(self.db()?, owner_id, limit).await
    }

    async fn query(
        &self,
        owner_id: &str,
        vector: &[f32],
        lexical_query: &str,
        k: usize,
        filters: &RetrievalFilters,
    ) -> Result<Vec<ScoredCandidate>, MnemoError> {
        queries::records::hybrid_candidates(self.db()?, owner_id, vector, lexical_query, k, filters)
            .await
    }

    async fn records_for_session(
        &self,
        session_id: &str,
        range: &TimeRange,
    ) -> Result<Vec<MemoryRecord>, MnemoError> {
        queries::records::records_for_session(
            self.db()?,
            session_id,
            range.since.clone(),
            range.until.clone(),
        )
        .await
    }

    async fn update_embedding(
        &self,
        record_id: &str,
        redacted_text: &str,
        embedding: &[f32],
        provider_id: &str,
    ) -> Result<(), MnemoError> {
        queries::records::update_embedding(self.db()?, record_id, redacted_text, embedding, provider_id)
            .await
    }

    async fn delete(&self, record_id: &str) -> Result<(), MnemoError> {
        queries::records::delete(self.db()?, record_id).await
    }

    async fn delete_owner(&self, owner_id: &str) -> Result<u64, MnemoError> {
        queries::records::delete_owner(self.db()?, owner_id).await
    }

    async fn delete_older_than(&self, cutoff: &str) -> Result<u64, MnemoError> {
        queries::records::delete_older_than(self.db()?, cutoff).await
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn active_session(
        &self,
        owner_id: &str,
        kind: &str,
    ) -> Result<Option<Session>, MnemoError> {
        queries::sessions::active_session(self.db()?, owner_id, kind).await
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>, MnemoError> {
        queries::sessions::get_session(self.db()?, id).await
    }

    async fn create_session(&self, session: &Session) -> Result<(), MnemoError> {
        queries::sessions::create_session(self.db()?, session).await
    }

    async fn touch_session(&self, id: &str, last_active_at: &str) -> Result<(), MnemoError> {
        queries::sessions::touch_session(self.db()?, id, last_active_at).await
    }

    async fn end_session(&self, id: &str) -> Result<(), MnemoError> {
        queries::sessions::end_session(self.db()?, id).await
    }

    async fn delete_owner_sessions(&self, owner_id: &str) -> Result<u64, MnemoError> {
        queries::sessions::delete_owner_sessions(self.db()?, owner_id).await
    }

    async fn delete_sessions_idle_before(&self, cutoff: &str) -> Result<u64, MnemoError> {
        queries::sessions::delete_sessions_idle_before(self.db()?, cutoff).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    fn make_record(id: &str, owner: &str, text: &str, embedding: Vec<f32>) -> MemoryRecord {
        MemoryRecord {
            id: id.to_string(),
            owner_id: owner.to_string(),
            session_id: "sess-1".to_string(),
            redacted_text: text.to_string(),
            embedding,
            provider_id: "local-fallback".to_string(),
            occurrences: 1,
            metadata: None,
            created_at: "2026-03-01T00:00:00.000Z".to_string(),
            last_seen_at: "2026-03-01T00:00:00.000Z".to_string(),
            source_turn_id: "turn-1".to_string(),
        }
    }

    async fn make_store(dir: &tempfile::TempDir, name: &str) -> SqliteStore {
        let path = dir.path().join(name);
        let store = SqliteStore::new(make_config(path.to_str().unwrap()));
        store.initialize().await.unwrap();
        store
    }

    #[tokio::test]
    async fn implements_plugin_adapter() {
        let dir = tempdir().unwrap();
        let store = make_store(&dir, "plugin.db").await;
        assert_eq!(store.name(), "sqlite");
        assert_eq!(store.adapter_type(), AdapterType::Storage);
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn operations_fail_before_initialize() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("uninit.db");
        let store = SqliteStore::new(make_config(path.to_str().unwrap()));
        assert!(store.get("any").await.is_err());
        assert!(store.health_check().await.is_err());
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let store = make_store(&dir, "double.db").await;
        assert!(store.initialize().await.is_err());
    }

    #[tokio::test]
    async fn persist_and_get_round_trip() {
        let dir = tempdir().unwrap();
        let store = make_store(&dir, "roundtrip.db").await;

        let record = make_record("r1", "owner-a", "prefers window seats", vec![0.1, 0.2, 0.3]);
        store.persist(&record).await.unwrap();

        let fetched = store.get("r1").await.unwrap().unwrap();
        assert_eq!(fetched.redacted_text, "prefers window seats");
        assert_eq!(fetched.embedding.len(), 3);
        assert_eq!(fetched.occurrences, 1);
    }

    #[tokio::test]
    async fn persist_is_an_upsert() {
        let dir = tempdir().unwrap();
        let store = make_store(&dir, "upsert.db").await;

        let mut record = make_record("r1", "owner-a", "first text", vec![1.0, 0.0]);
        store.persist(&record).await.unwrap();
        record.redacted_text = "second text".to_string();
        store.persist(&record).await.unwrap();

        let fetched = store.get("r1").await.unwrap().unwrap();
        assert_eq!(fetched.redacted_text, "second text");
    }

    #[tokio::test]
    async fn merge_occurrence_bumps_count_and_timestamp() {
        let dir = tempdir().unwrap();
        let store = make_store(&dir, "merge.db").await;

        let record = make_record("r1", "owner-a", "likes jazz", vec![1.0, 0.0]);
        store.persist(&record).await.unwrap();
        store
            .merge_occurrence("r1", "2026-03-02T00:00:00.000Z")
            .await
            .unwrap();

        let fetched = store.get("r1").await.unwrap().unwrap();
        assert_eq!(fetched.occurrences, 2);
        assert_eq!(fetched.last_seen_at, "2026-03-02T00:00:00.000Z");
        assert_eq!(fetched.created_at, "2026-03-01T00:00:00.000Z");
    }

    #[tokio::test]
    async fn get_many_preserves_order_and_skips_missing() {
        let dir = tempdir().unwrap();
        let store = make_store(&dir, "many.db").await;

        for id in ["a", "b", "c"] {
            store
                .persist(&make_record(id, "owner-a", id, vec![1.0]))
                .await
                .unwrap();
        }
        let fetched = store
            .get_many(&[
                "c".to_string(),
                "missing".to_string(),
                "a".to_string(),
            ])
            .await
            .unwrap();
        let ids: Vec<&str> = fetched.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
    }

    #[tokio::test]
    async fn query_never_crosses_owner_scope() {
        let dir = tempdir().unwrap();
        let store = make_store(&dir, "scope.db").await;

        store
            .persist(&make_record("mine", "owner-a", "beach trip plans", vec![1.0, 0.0]))
            .await
            .unwrap();
        store
            .persist(&make_record("theirs", "owner-b", "beach trip plans", vec![1.0, 0.0]))
            .await
            .unwrap();

        let candidates = store
            .query(
                "owner-a",
                &[1.0, 0.0],
                "beach trip",
                10,
                &RetrievalFilters::default(),
            )
            .await
            .unwrap();
        assert!(!candidates.is_empty());
        assert!(candidates.iter().all(|c| c.id == "mine"));
    }

    #[tokio::test]
    async fn query_returns_lexical_scores_for_keyword_matches() {
        let dir = tempdir().unwrap();
        let store = make_store(&dir, "lexical.db").await;

        store
            .persist(&make_record(
                "r1",
                "owner-a",
                "booked a trip to the coast",
                vec![0.0, 1.0],
            ))
            .await
            .unwrap();

        let candidates = store
            .query(
                "owner-a",
                &[1.0, 0.0],
                "coast trip",
                10,
                &RetrievalFilters::default(),
            )
            .await
            .unwrap();
        let hit = candidates.iter().find(|c| c.id == "r1").unwrap();
        assert!(hit.lexical_score.is_some());
        // FTS5 bm25 is negative for relevant rows.
        assert!(hit.lexical_score.unwrap() < 0.0);
    }

    #[tokio::test]
    async fn query_with_session_filter() {
        let dir = tempdir().unwrap();
        let store = make_store(&dir, "filter.db").await;

        let mut in_session = make_record("in", "owner-a", "alpha", vec![1.0]);
        in_session.session_id = "sess-1".to_string();
        let mut other = make_record("out", "owner-a", "alpha", vec![1.0]);
        other.session_id = "sess-2".to_string();
        store.persist(&in_session).await.unwrap();
        store.persist(&other).await.unwrap();

        let filters = RetrievalFilters {
            session_id: Some("sess-1".to_string()),
            since: None,
        };
        let candidates = store
            .query("owner-a", &[1.0], "alpha", 10, &filters)
            .await
            .unwrap();
        assert!(candidates.iter().all(|c| c.id == "in"));
    }

    #[tokio::test]
    async fn update_embedding_rewrites_in_place() {
        let dir = tempdir().unwrap();
        let store = make_store(&dir, "backfill.db").await;

        store
            .persist(&make_record("r1", "owner-a", "old text", vec![1.0, 0.0]))
            .await
            .unwrap();
        store
            .update_embedding("r1", "new text", &[0.0, 1.0], "text-embedding-3-small")
            .await
            .unwrap();

        let fetched = store.get("r1").await.unwrap().unwrap();
        assert_eq!(fetched.redacted_text, "new text");
        assert_eq!(fetched.provider_id, "text-embedding-3-small");
        assert_eq!(fetched.embedding, vec![0.0, 1.0]);

        // FTS index follows the rewrite.
        let candidates = store
            .query("owner-a", &[0.0, 1.0], "new", 10, &RetrievalFilters::default())
            .await
            .unwrap();
        assert!(candidates.iter().any(|c| c.id == "r1" && c.lexical_score.is_some()));
    }

    #[tokio::test]
    async fn delete_owner_erases_everything_and_reports_count() {
        let dir = tempdir().unwrap();
        let store = make_store(&dir, "erase.db").await;

        for id in ["a", "b"] {
            store
                .persist(&make_record(id, "owner-a", "text", vec![1.0]))
                .await
                .unwrap();
        }
        store
            .persist(&make_record("c", "owner-b", "text", vec![1.0]))
            .await
            .unwrap();

        let removed = store.delete_owner("owner-a").await.unwrap();
        assert_eq!(removed, 2);
        assert!(store.get("a").await.unwrap().is_none());
        assert!(store.get("c").await.unwrap().is_some());

        // Second pass removes nothing.
        assert_eq!(store.delete_owner("owner-a").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_older_than_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = make_store(&dir, "sweep.db").await;

        let mut old = make_record("old", "owner-a", "stale", vec![1.0]);
        old.created_at = "2025-01-01T00:00:00.000Z".to_string();
        store.persist(&old).await.unwrap();
        store
            .persist(&make_record("fresh", "owner-a", "fresh", vec![1.0]))
            .await
            .unwrap();

        let cutoff = "2026-01-01T00:00:00.000Z";
        assert_eq!(store.delete_older_than(cutoff).await.unwrap(), 1);
        assert_eq!(store.delete_older_than(cutoff).await.unwrap(), 0);
        assert!(store.get("fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn session_lifecycle() {
        let dir = tempdir().unwrap();
        let store = make_store(&dir, "sessions.db").await;

        let session = Session {
            id: "s1".to_string(),
            owner_id: "owner-a".to_string(),
            kind: "travel-plan".to_string(),
            created_at: "2026-03-01T00:00:00.000Z".to_string(),
            last_active_at: "2026-03-01T00:00:00.000Z".to_string(),
        };
        store.create_session(&session).await.unwrap();

        let active = store
            .active_session("owner-a", "travel-plan")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(active.id, "s1");

        store
            .touch_session("s1", "2026-03-01T01:00:00.000Z")
            .await
            .unwrap();
        let touched = store.get_session("s1").await.unwrap().unwrap();
        assert_eq!(touched.last_active_at, "2026-03-01T01:00:00.000Z");

        store.end_session("s1").await.unwrap();
        assert!(store
            .active_session("owner-a", "travel-plan")
            .await
            .unwrap()
            .is_none());
        // Still readable by id after ending.
        assert!(store.get_session("s1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn second_active_session_for_pair_is_rejected() {
        let dir = tempdir().unwrap();
        let store = make_store(&dir, "unique.db").await;

        let mut session = Session {
            id: "s1".to_string(),
            owner_id: "owner-a".to_string(),
            kind: "travel-plan".to_string(),
            created_at: "2026-03-01T00:00:00.000Z".to_string(),
            last_active_at: "2026-03-01T00:00:00.000Z".to_string(),
        };
        store.create_session(&session).await.unwrap();
        session.id = "s2".to_string();
        assert!(store.create_session(&session).await.is_err());

        // A different kind is a different pair.
        session.kind = "grocery-list".to_string();
        store.create_session(&session).await.unwrap();
    }

    #[tokio::test]
    async fn idle_session_sweep() {
        let dir = tempdir().unwrap();
        let store = make_store(&dir, "idle.db").await;

        let idle = Session {
            id: "idle".to_string(),
            owner_id: "owner-a".to_string(),
            kind: "a".to_string(),
            created_at: "2025-01-01T00:00:00.000Z".to_string(),
            last_active_at: "2025-01-01T00:00:00.000Z".to_string(),
        };
        let fresh = Session {
            id: "fresh".to_string(),
            owner_id: "owner-a".to_string(),
            kind: "b".to_string(),
            created_at: "2026-03-01T00:00:00.000Z".to_string(),
            last_active_at: "2026-03-01T00:00:00.000Z".to_string(),
        };
        store.create_session(&idle).await.unwrap();
        store.create_session(&fresh).await.unwrap();

        let removed = store
            .delete_sessions_idle_before("2026-01-01T00:00:00.000Z")
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(store.get_session("idle").await.unwrap().is_none());
        assert!(store.get_session("fresh").await.unwrap().is_some());
    }
}
