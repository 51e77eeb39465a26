// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content-free result cache.
//!
//! Keys are hashes over the full retrieval identity (owner, redacted query
//! text, k, filters, embedding-provider id); values are serialized
//! `{record_id, score, chunk_index}` lists. No record text ever enters the
//! cache, so a cache hit still requires rehydration from canonical
//! storage, which is also what keeps erased records from resurfacing.
//!
//! Every cache failure is survivable: callers fall through to the compute
//! path.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::warn;

use mnemo_config::model::CacheConfig;
use mnemo_core::types::{CachedHit, RetrievalFilters, RetrievedRecord};
use mnemo_core::EphemeralCache;

/// The result cache over any [`EphemeralCache`] backend.
pub struct ResultCache {
    backend: Option<Arc<dyn EphemeralCache>>,
    enabled: bool,
    ttl_secs: u64,
}

impl ResultCache {
    pub fn new(backend: Option<Arc<dyn EphemeralCache>>, config: &CacheConfig) -> Self {
        Self {
            backend,
            enabled: config.enabled,
            ttl_secs: config.ttl_secs,
        }
    }

    /// Build the cache key for one retrieval.
    ///
    /// The provider id is part of the identity: entries computed under a
    /// retired embedding model miss instead of serving stale ranks.
    pub fn key(
        owner_id: &str,
        query_text: &str,
        k: usize,
        filters: &RetrievalFilters,
        provider_id: &str,
    ) -> String {
        let mut hasher = Sha256::new();
        for part in [
            owner_id,
            query_text,
            &k.to_string(),
            filters.session_id.as_deref().unwrap_or(""),
            filters.since.as_deref().unwrap_or(""),
            provider_id,
        ] {
            hasher.update(part.as_bytes());
            hasher.update([0x1f]);
        }
        format!("mnemo:rc:{}", hex::encode(hasher.finalize()))
    }

    /// Look up a cached hit list. Misses, disabled cache, and backend
    /// errors all come back as `None`.
    pub async fn get(&self, key: &str) -> Option<Vec<CachedHit>> {
        if !self.enabled {
            return None;
        }
        let backend = self.backend.as_ref()?;
        match backend.get(key).await {
            Ok(Some(value)) => match serde_json::from_str(&value) {
                Ok(hits) => Some(hits),
                Err(err) => {
                    warn!(error = %err, "discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(error = %err, "result cache read failed, computing instead");
                None
            }
        }
    }

    /// Store a hit list. Failures are logged and swallowed.
    pub async fn put(&self, key: &str, hits: &[RetrievedRecord]) {
        if !self.enabled {
            return;
        }
        let Some(backend) = self.backend.as_ref() else {
            return;
        };
        let cached: Vec<CachedHit> = hits
            .iter()
            .map(|h| CachedHit {
                record_id: h.record.id.clone(),
                score: h.score,
                chunk_index: h.rank as u32,
            })
            .collect();
        let value = match serde_json::to_string(&cached) {
            Ok(v) => v,
            Err(err) => {
                warn!(error = %err, "failed to serialize cache entry");
                return;
            }
        };
        if let Err(err) = backend.set(key, &value, self.ttl_secs).await {
            warn!(error = %err, "result cache write failed");
        }
    }
}
