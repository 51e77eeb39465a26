// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Optional rerank pass over hybrid retrieval results.
//!
//! Strictly best-effort: a missing, unavailable, failing, or slow reranker
//! leaves the hybrid order untouched and marks the result degraded.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use mnemo_config::model::RetrievalConfig;
use mnemo_core::types::RetrievedRecord;
use mnemo_core::RerankProvider;

/// The rerank stage of retrieval.
pub struct RerankStage {
    provider: Option<Arc<dyn RerankProvider>>,
    enabled: bool,
    timeout: Duration,
}

impl RerankStage {
    pub fn new(provider: Option<Arc<dyn RerankProvider>>, config: &RetrievalConfig) -> Self {
        Self {
            provider,
            enabled: config.rerank_enabled,
            timeout: Duration::from_millis(config.rerank_timeout_ms),
        }
    }

    /// Rerank `hits` if a provider is wired in and responsive.
    ///
    /// Returns the (possibly reordered) hits and whether the result is
    /// degraded. A stage that is disabled or was never given a provider is
    /// not degraded; a provider that should have run but could not is.
    pub async fn apply(
        &self,
        query: &str,
        hits: Vec<RetrievedRecord>,
    ) -> (Vec<RetrievedRecord>, bool) {
        if !self.enabled || hits.is_empty() {
            return (hits, false);
        }
        let Some(provider) = &self.provider else {
            return (hits, false);
        };
        if !provider.available() {
            warn!("rerank provider unavailable, keeping hybrid order");
            return (hits, true);
        }

        let original = hits.clone();
        match tokio::time::timeout(self.timeout, provider.rerank(query, hits)).await {
            Ok(Ok(reranked)) if reranked.len() == original.len() => {
                let reranked = reranked
                    .into_iter()
                    .enumerate()
                    .map(|(rank, mut hit)| {
                        hit.rank = rank;
                        hit
                    })
                    .collect();
                (reranked, false)
            }
            Ok(Ok(reranked)) => {
                warn!(
                    expected = original.len(),
                    got = reranked.len(),
                    "rerank changed candidate count, keeping hybrid order"
                );
                (original, true)
            }
            Ok(Err(err)) => {
                warn!(error = %err, "rerank failed, keeping hybrid order");
                (original, true)
            }
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64,
                    "rerank timed out, keeping hybrid order");
                (original, true)
            }
        }
    }
}
