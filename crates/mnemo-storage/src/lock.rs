// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TTL lease lock on top of the SQLite leases table.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use mnemo_core::types::LeaseToken;
use mnemo_core::{DistributedLock, MnemoError};

use crate::database::Database;
use crate::queries;

/// Lease lock sharing the canonical store's database.
///
/// Expired leases are taken over on the next acquire attempt rather than
/// reaped by a background task; a crashed holder therefore blocks
/// contenders for at most one TTL.
pub struct SqliteLeaseLock {
    db: Database,
}

impl SqliteLeaseLock {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DistributedLock for SqliteLeaseLock {
    async fn try_acquire(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<Option<LeaseToken>, MnemoError> {
        let token = Uuid::new_v4().to_string();
        let acquired =
            queries::leases::try_acquire(&self.db, key, &token, ttl.as_secs()).await?;
        if acquired {
            debug!(key, "lease acquired");
            Ok(Some(LeaseToken {
                key: key.to_string(),
                token,
            }))
        } else {
            debug!(key, "lease contended");
            Ok(None)
        }
    }

    async fn release(&self, token: LeaseToken) -> Result<(), MnemoError> {
        queries::leases::release(&self.db, &token.key, &token.token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn make_lock(dir: &tempfile::TempDir) -> SqliteLeaseLock {
        let path = dir.path().join("lock.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();
        SqliteLeaseLock::new(db)
    }

    #[tokio::test]
    async fn acquire_then_contend() {
        let dir = tempdir().unwrap();
        let lock = make_lock(&dir).await;

        let ttl = Duration::from_secs(10);
        let lease = lock.try_acquire("session:owner-a:travel", ttl).await.unwrap();
        assert!(lease.is_some());

        let second = lock.try_acquire("session:owner-a:travel", ttl).await.unwrap();
        assert!(second.is_none(), "unexpired lease must block contenders");
    }

    #[tokio::test]
    async fn release_frees_the_key() {
        let dir = tempdir().unwrap();
        let lock = make_lock(&dir).await;

        let ttl = Duration::from_secs(10);
        let lease = lock.try_acquire("k", ttl).await.unwrap().unwrap();
        lock.release(lease).await.unwrap();

        assert!(lock.try_acquire("k", ttl).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn expired_lease_is_taken_over() {
        let dir = tempdir().unwrap();
        let lock = make_lock(&dir).await;

        let first = lock
            .try_acquire("k", Duration::from_secs(0))
            .await
            .unwrap();
        assert!(first.is_some());

        // Zero TTL expires immediately; the next acquire steals it.
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = lock.try_acquire("k", Duration::from_secs(10)).await.unwrap();
        assert!(second.is_some());
    }

    #[tokio::test]
    async fn releasing_a_stolen_lease_is_a_noop() {
        let dir = tempdir().unwrap();
        let lock = make_lock(&dir).await;

        let stale = lock
            .try_acquire("k", Duration::from_secs(0))
            .await
            .unwrap()
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let fresh = lock
            .try_acquire("k", Duration::from_secs(10))
            .await
            .unwrap()
            .unwrap();

        // The stale holder releases after losing the lease.
        lock.release(stale).await.unwrap();

        // The fresh lease still blocks others.
        assert!(lock
            .try_acquire("k", Duration::from_secs(10))
            .await
            .unwrap()
            .is_none());
        lock.release(fresh).await.unwrap();
    }

    #[tokio::test]
    async fn independent_keys_do_not_contend() {
        let dir = tempdir().unwrap();
        let lock = make_lock(&dir).await;

        let ttl = Duration::from_secs(10);
        assert!(lock.try_acquire("a", ttl).await.unwrap().is_some());
        assert!(lock.try_acquire("b", ttl).await.unwrap().is_some());
    }
}
