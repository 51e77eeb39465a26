// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic embedding providers for tests.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use mnemo_core::types::{
    AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus, QueryEmbedding,
};
use mnemo_core::{EmbeddingProvider, MnemoError, PluginAdapter};

/// Embeds text as a unit vector derived purely from its content.
///
/// Identical texts embed identically (cosine 1.0); unrelated texts land
/// on effectively uncorrelated vectors. No network, no model.
pub struct MockEmbeddingProvider {
    provider_id: String,
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn new(provider_id: impl Into<String>, dimensions: usize) -> Self {
        Self {
            provider_id: provider_id.into(),
            dimensions,
        }
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = Vec::with_capacity(self.dimensions);
        for i in 0..self.dimensions {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            // Map the 64-bit hash onto [-1, 1].
            let raw = hasher.finish() as i64 as f64 / i64::MAX as f64;
            vector.push(raw as f32);
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new("mock-embedder", 8)
    }
}

#[async_trait]
impl PluginAdapter for MockEmbeddingProvider {
    fn name(&self) -> &str {
        "mock-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, MnemoError> {
        let embeddings = input.texts.iter().map(|t| self.vector_for(t)).collect();
        Ok(EmbeddingOutput {
            embeddings,
            dimensions: self.dimensions,
            provider_id: self.provider_id.clone(),
        })
    }

    async fn embed_query(&self, text: &str) -> Result<QueryEmbedding, MnemoError> {
        Ok(QueryEmbedding {
            vector: self.vector_for(text),
            provider_id: self.provider_id.clone(),
        })
    }
}

/// Fails a fixed number of calls, then delegates to an inner mock.
///
/// With `failures == u32::MAX` the provider never recovers, which is how
/// fallback-chain tests force the local layer.
pub struct FlakyEmbeddingProvider {
    inner: MockEmbeddingProvider,
    remaining_failures: AtomicU32,
}

impl FlakyEmbeddingProvider {
    pub fn new(provider_id: impl Into<String>, dimensions: usize, failures: u32) -> Self {
        Self {
            inner: MockEmbeddingProvider::new(provider_id, dimensions),
            remaining_failures: AtomicU32::new(failures),
        }
    }

    fn should_fail(&self) -> bool {
        if self.remaining_failures.load(Ordering::SeqCst) == u32::MAX {
            return true;
        }
        self.remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn failure(&self) -> MnemoError {
        MnemoError::Provider {
            message: format!("{}: simulated outage", self.inner.provider_id()),
            source: None,
        }
    }
}

#[async_trait]
impl PluginAdapter for FlakyEmbeddingProvider {
    fn name(&self) -> &str {
        "flaky-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        if self.remaining_failures.load(Ordering::SeqCst) > 0 {
            Ok(HealthStatus::Unhealthy("simulated outage".to_string()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingProvider for FlakyEmbeddingProvider {
    fn provider_id(&self) -> &str {
        self.inner.provider_id()
    }

    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, MnemoError> {
        if self.should_fail() {
            return Err(self.failure());
        }
        self.inner.embed(input).await
    }

    async fn embed_query(&self, text: &str) -> Result<QueryEmbedding, MnemoError> {
        if self.should_fail() {
            return Err(self.failure());
        }
        self.inner.embed_query(text).await
    }
}
