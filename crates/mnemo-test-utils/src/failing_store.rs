// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A store whose every operation fails, for canonical-down and
//! mirror-down scenarios.

use async_trait::async_trait;

use mnemo_core::types::{
    AdapterType, HealthStatus, MemoryRecord, RetrievalFilters, ScoredCandidate, TimeRange,
};
use mnemo_core::{MemoryStoreAdapter, MnemoError, PluginAdapter};

pub struct FailingStore;

impl FailingStore {
    fn err(&self) -> MnemoError {
        MnemoError::Storage {
            source: "simulated backend outage".into(),
        }
    }
}

#[async_trait]
impl PluginAdapter for FailingStore {
    fn name(&self) -> &str {
        "failing-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        Ok(HealthStatus::Unhealthy("simulated backend outage".into()))
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        Ok(())
    }
}

#[async_trait]
impl MemoryStoreAdapter for FailingStore {
    async fn persist(&self, _record: &MemoryRecord) -> Result<(), MnemoError> {
        Err(self.err())
    }

    async fn merge_occurrence(&self, _id: &str, _last_seen_at: &str) -> Result<(), MnemoError> {
        Err(self.err())
    }

    async fn get(&self, _id: &str) -> Result<Option<MemoryRecord>, MnemoError> {
        Err(self.err())
    }

    async fn get_many(&self, _ids: &[String]) -> Result<Vec<MemoryRecord>, MnemoError> {
        Err(self.err())
    }

    async fn recent(&self, _owner_id: &str, _limit: usize) -> Result<Vec<MemoryRecord>, MnemoError> {
        Err(self.err())
    }

    async fn query(
        &self,
        _owner_id: &str,
        _vector: &[f32],
        _lexical_query: &str,
        _k: usize,
        _filters: &RetrievalFilters,
    ) -> Result<Vec<ScoredCandidate>, MnemoError> {
        Err(self.err())
    }

    async fn records_for_session(
        &self,
        _session_id: &str,
        _range: &TimeRange,
    ) -> Result<Vec<MemoryRecord>, MnemoError> {
        Err(self.err())
    }

    async fn update_embedding(
        &self,
        _id: &str,
        _redacted_text: &str,
        _embedding: &[f32],
        _provider_id: &str,
    ) -> Result<(), MnemoError> {
        Err(self.err())
    }

    async fn delete(&self, _id: &str) -> Result<(), MnemoError> {
        Err(self.err())
    }

    async fn delete_owner(&self, _owner_id: &str) -> Result<u64, MnemoError> {
        Err(self.err())
    }

    async fn delete_older_than(&self, _cutoff: &str) -> Result<u64, MnemoError> {
        Err(self.err())
    }
}
