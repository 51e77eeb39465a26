// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory mirror store.
//!
//! Implements the same record interface as the canonical SQLite store but
//! holds everything in a process-local map and supports vector scoring
//! only (`lexical_score` is always `None`). Deployed as a best-effort
//! mirror: the orchestrator replicates writes here without awaiting them
//! on the ingestion path.

use async_trait::async_trait;
use dashmap::DashMap;

use mnemo_core::types::{
    cosine_similarity, AdapterType, HealthStatus, MemoryRecord, RetrievalFilters,
    ScoredCandidate, TimeRange,
};
use mnemo_core::{MemoryStoreAdapter, MnemoError, PluginAdapter};

/// Record store backed by a concurrent in-process map.
#[derive(Default)]
pub struct EphemeralStore {
    records: DashMap<String, MemoryRecord>,
}

impl EphemeralStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl PluginAdapter for EphemeralStore {
    fn name(&self) -> &str {
        "ephemeral"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        self.records.clear();
        Ok(())
    }
}

#[async_trait]
impl MemoryStoreAdapter for EphemeralStore {
    async fn persist(&self, record: &MemoryRecord) -> Result<(), MnemoError> {
        self.records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn merge_occurrence(
        &self,
        record_id: &str,
        last_seen_at: &str,
    ) -> Result<(), MnemoError> {
        if let Some(mut record) = self.records.get_mut(record_id) {
            record.occurrences += 1;
            record.last_seen_at = last_seen_at.to_string();
        }
        Ok(())
    }

    async fn get(&self, record_id: &str) -> Result<Option<MemoryRecord>, MnemoError> {
        Ok(self.records.get(record_id).map(|r| r.clone()))
    }

    async fn get_many(&self, record_ids: &[String]) -> Result<Vec<MemoryRecord>, MnemoError> {
        Ok(record_ids
            .iter()
            .filter_map(|id| self.records.get(id).map(|r| r.clone()))
            .collect())
    }

    async fn recent(&self, owner_id: &str, limit: usize) -> Result<Vec<MemoryRecord>, MnemoError> {
        let mut records: Vec<MemoryRecord> = self
            .records
            .iter()
            .filter(|r| r.owner_id == owner_id)
            .map(|r| r.clone())
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }

    async fn query(
        &self,
        owner_id: &str,
        vector: &[f32],
        _lexical_query: &str,
        k: usize,
        filters: &RetrievalFilters,
    ) -> Result<Vec<ScoredCandidate>, MnemoError> {
        let mut candidates: Vec<ScoredCandidate> = self
            .records
            .iter()
            .filter(|r| r.owner_id == owner_id)
            .filter(|r| {
                filters
                    .session_id
                    .as_ref()
                    .is_none_or(|s| &r.session_id == s)
            })
            .filter(|r| filters.since.as_ref().is_none_or(|s| &r.created_at >= s))
            .map(|r| ScoredCandidate {
                id: r.id.clone(),
                vector_score: cosine_similarity(vector, &r.embedding),
                lexical_score: None,
                created_at: r.created_at.clone(),
            })
            .collect();
        candidates.sort_by(|a, b| {
            b.vector_score
                .partial_cmp(&a.vector_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(k);
        Ok(candidates)
    }

    async fn records_for_session(
        &self,
        session_id: &str,
        range: &TimeRange,
    ) -> Result<Vec<MemoryRecord>, MnemoError> {
        let mut records: Vec<MemoryRecord> = self
            .records
            .iter()
            .filter(|r| r.session_id == session_id)
            .filter(|r| range.since.as_ref().is_none_or(|s| &r.created_at >= s))
            .filter(|r| range.until.as_ref().is_none_or(|u| &r.created_at < u))
            .map(|r| r.clone())
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }

    async fn update_embedding(
        &self,
        record_id: &str,
        redacted_text: &str,
        embedding: &[f32],
        provider_id: &str,
    ) -> Result<(), MnemoError> {
        if let Some(mut record) = self.records.get_mut(record_id) {
            record.redacted_text = redacted_text.to_string();
            record.embedding = embedding.to_vec();
            record.provider_id = provider_id.to_string();
        }
        Ok(())
    }

    async fn delete(&self, record_id: &str) -> Result<(), MnemoError> {
        self.records.remove(record_id);
        Ok(())
    }

    async fn delete_owner(&self, owner_id: &str) -> Result<u64, MnemoError> {
        let before = self.records.len();
        self.records.retain(|_, r| r.owner_id != owner_id);
        Ok((before - self.records.len()) as u64)
    }

    async fn delete_older_than(&self, cutoff: &str) -> Result<u64, MnemoError> {
        let before = self.records.len();
        self.records.retain(|_, r| r.created_at.as_str() >= cutoff);
        Ok((before - self.records.len()) as u64)
    }
}
