// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process TTL cache backing the content-free result cache.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use mnemo_core::{EphemeralCache, MnemoError};

/// TTL cache over a concurrent map. Expired entries are dropped lazily on
/// read; there is no background reaper.
#[derive(Default)]
pub struct InMemoryCache {
    entries: DashMap<String, (String, Instant)>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EphemeralCache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, MnemoError> {
        if let Some(entry) = self.entries.get(key) {
            let (value, deadline) = entry.value();
            if Instant::now() < *deadline {
                return Ok(Some(value.clone()));
            }
        }
        // Either absent or expired; drop any stale entry.
        self.entries.remove_if(key, |_, (_, deadline)| Instant::now() >= *deadline);
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), MnemoError> {
        let deadline = Instant::now() + Duration::from_secs(ttl_secs);
        self.entries
            .insert(key.to_string(), (value.to_string(), deadline));
        Ok(())
    }
}
