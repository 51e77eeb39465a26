// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ephemeral cache trait for short-TTL, content-free values.

use async_trait::async_trait;

use crate::error::MnemoError;

/// A best-effort TTL cache.
///
/// Values are opaque strings; the result cache stores only serialized
/// `{record_id, score, chunk_index}` lists, never text. Entries expire via
/// TTL only. Cache unavailability is always survivable: callers fall
/// through to the compute path.
#[async_trait]
pub trait EphemeralCache: Send + Sync + 'static {
    /// Fetch an unexpired value.
    async fn get(&self, key: &str) -> Result<Option<String>, MnemoError>;

    /// Store a value with a TTL in seconds.
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), MnemoError>;
}
