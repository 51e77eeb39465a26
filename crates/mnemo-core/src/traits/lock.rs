// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Distributed lock trait for short-lived mutual exclusion.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::MnemoError;
use crate::types::LeaseToken;

/// A TTL-bounded lease lock.
///
/// The session manager acquires a lease keyed by `(owner_id, kind)` around
/// its read-check-create sequence. This is the engine's sole explicit
/// mutual-exclusion primitive; all other mutations use idempotent
/// upsert/merge semantics.
#[async_trait]
pub trait DistributedLock: Send + Sync + 'static {
    /// Try to acquire the lease for `key`. Returns `None` when another
    /// holder has an unexpired lease.
    async fn try_acquire(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<Option<LeaseToken>, MnemoError>;

    /// Release a previously acquired lease. Releasing an already-expired or
    /// stolen lease is a no-op, not an error.
    async fn release(&self, token: LeaseToken) -> Result<(), MnemoError>;
}
