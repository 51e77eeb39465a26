// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rerank provider trait for optional relevance refinement.

use async_trait::async_trait;

use crate::error::MnemoError;
use crate::types::RetrievedRecord;

/// A secondary, costlier relevance pass over an initial candidate set.
///
/// Strictly optional: callers treat an unavailable or failing reranker as
/// the identity function, preserving hybrid order. Implementations must
/// reorder only, never drop or add candidates.
#[async_trait]
pub trait RerankProvider: Send + Sync + 'static {
    /// Whether the provider is currently able to serve rerank calls.
    fn available(&self) -> bool;

    /// Reorder `candidates` by relevance to `query`.
    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<RetrievedRecord>,
    ) -> Result<Vec<RetrievedRecord>, MnemoError>;
}
