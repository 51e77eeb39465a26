// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retention sweeps and per-owner erasure.
//!
//! The sweep deletes records and idle sessions older than the configured
//! window. Canonical deletions are fatal on failure; mirror deletions are
//! best-effort. Both paths are idempotent, so an operator can re-run a
//! sweep or an erasure after a partial failure.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use tracing::{info, warn};

use mnemo_config::model::RetentionConfig;
use mnemo_core::{MemoryStoreAdapter, MnemoError, SessionStore};

/// Outcome of one retention sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// RFC 3339 cutoff the sweep used.
    pub cutoff: String,
    /// Records removed from the canonical store.
    pub records_removed: u64,
    /// Sessions removed for idleness.
    pub sessions_removed: u64,
}

/// Outcome of a per-owner erasure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErasureReport {
    pub records_removed: u64,
    pub sessions_removed: u64,
}

/// Retention and erasure over the canonical store and its mirrors.
pub struct RetentionManager {
    canonical: Arc<dyn MemoryStoreAdapter>,
    mirrors: Vec<Arc<dyn MemoryStoreAdapter>>,
    sessions: Arc<dyn SessionStore>,
    config: RetentionConfig,
}

impl RetentionManager {
    pub fn new(
        canonical: Arc<dyn MemoryStoreAdapter>,
        mirrors: Vec<Arc<dyn MemoryStoreAdapter>>,
        sessions: Arc<dyn SessionStore>,
        config: RetentionConfig,
    ) -> Self {
        Self {
            canonical,
            mirrors,
            sessions,
            config,
        }
    }

    /// Sweep using the configured retention window, anchored at now.
    pub async fn sweep(&self) -> Result<SweepReport, MnemoError> {
        let cutoff = (Utc::now() - ChronoDuration::days(i64::from(self.config.retention_days)))
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string();
        self.sweep_before(&cutoff).await
    }

    /// Sweep everything created (records) or last active (sessions) before
    /// an explicit cutoff. Idempotent: a repeat run removes nothing.
    pub async fn sweep_before(&self, cutoff: &str) -> Result<SweepReport, MnemoError> {
        let records_removed = self.canonical.delete_older_than(cutoff).await?;

        for mirror in &self.mirrors {
            if let Err(err) = mirror.delete_older_than(cutoff).await {
                warn!(adapter = mirror.name(), error = %err, "mirror sweep failed");
            }
        }

        let sessions_removed = self.sessions.delete_sessions_idle_before(cutoff).await?;

        info!(cutoff, records_removed, sessions_removed, "retention sweep complete");
        metrics::counter!("mnemo_sweep_records_removed_total").increment(records_removed);
        metrics::counter!("mnemo_sweep_sessions_removed_total").increment(sessions_removed);

        Ok(SweepReport {
            cutoff: cutoff.to_string(),
            records_removed,
            sessions_removed,
        })
    }

    /// Erase one owner entirely: records on canonical and mirrors, then
    /// sessions. Canonical failure aborts before any mirror is touched so
    /// a retry sees consistent state.
    pub async fn delete_owner(&self, owner_id: &str) -> Result<ErasureReport, MnemoError> {
        let records_removed = self.canonical.delete_owner(owner_id).await?;

        for mirror in &self.mirrors {
            if let Err(err) = mirror.delete_owner(owner_id).await {
                warn!(adapter = mirror.name(), error = %err, "mirror erasure failed");
            }
        }

        let sessions_removed = self.sessions.delete_owner_sessions(owner_id).await?;

        info!(owner_id, records_removed, sessions_removed, "owner erased");
        Ok(ErasureReport {
            records_removed,
            sessions_removed,
        })
    }

    /// Spawn the periodic sweep task. The handle aborts the loop when
    /// dropped by the caller via [`tokio::task::JoinHandle::abort`].
    pub fn spawn_periodic(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        let interval = std::time::Duration::from_secs(self.config.sweep_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The immediate first tick would sweep at startup; skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(err) = manager.sweep().await {
                    warn!(error = %err, "scheduled retention sweep failed");
                }
            }
        })
    }
}
