// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Near-duplicate detection against an owner's recent records.
//!
//! Compares a fresh embedding against the lookback window by cosine
//! similarity. At or above the threshold the ingest merges into the
//! existing record; below it, or when the window cannot be read, it
//! inserts. Failing open keeps ingestion alive at the cost of a possible
//! duplicate, which a later merge can absorb.

use std::sync::Arc;

use tracing::{debug, warn};

use mnemo_config::model::DedupConfig;
use mnemo_core::types::cosine_similarity;
use mnemo_core::{MemoryStoreAdapter, MnemoError};

/// What to do with an incoming ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupDecision {
    /// No near-duplicate found: create a new record.
    Insert,
    /// Merge into the existing record with this id.
    Merge(String),
}

/// Near-duplicate merger over the canonical store.
pub struct Deduplicator {
    store: Arc<dyn MemoryStoreAdapter>,
    config: DedupConfig,
}

impl Deduplicator {
    pub fn new(store: Arc<dyn MemoryStoreAdapter>, config: DedupConfig) -> Self {
        Self { store, config }
    }

    /// Decide whether `embedding` duplicates one of the owner's recent
    /// records.
    ///
    /// Mixed-provider and mixed-dimensionality comparisons score 0.0 and
    /// therefore never merge.
    pub async fn decide(&self, owner_id: &str, embedding: &[f32]) -> DedupDecision {
        let recents = match self.store.recent(owner_id, self.config.lookback).await {
            Ok(recents) => recents,
            Err(err) => {
                warn!(owner_id, error = %err, "dedup lookback failed, inserting");
                return DedupDecision::Insert;
            }
        };

        let mut best: Option<(&str, f32)> = None;
        for record in &recents {
            let similarity = cosine_similarity(embedding, &record.embedding);
            if best.is_none_or(|(_, s)| similarity > s) {
                best = Some((&record.id, similarity));
            }
        }

        match best {
            Some((id, similarity)) if similarity >= self.config.similarity_threshold => {
                debug!(record_id = id, similarity, "merging near-duplicate ingest");
                DedupDecision::Merge(id.to_string())
            }
            _ => DedupDecision::Insert,
        }
    }
}
