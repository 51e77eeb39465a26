// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding provider trait for text-to-vector conversion.

use async_trait::async_trait;

use crate::error::MnemoError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{EmbeddingInput, EmbeddingOutput, QueryEmbedding};

/// Converts text into fixed-dimensionality vectors for semantic retrieval.
///
/// Implementations report a stable `provider_id` that is baked into every
/// stored record and every cache key: vectors from different providers are
/// not comparable, and a cache entry computed under a retired model must
/// never be served.
#[async_trait]
pub trait EmbeddingProvider: PluginAdapter {
    /// Stable identity of the underlying model, e.g. `text-embedding-3-small`
    /// or `local-fallback`.
    fn provider_id(&self) -> &str;

    /// Embed a batch of texts. All output vectors share the configured
    /// dimensionality.
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, MnemoError>;

    /// Embed a single retrieval query, tagging the result with the provider
    /// that produced it.
    async fn embed_query(&self, text: &str) -> Result<QueryEmbedding, MnemoError>;
}
