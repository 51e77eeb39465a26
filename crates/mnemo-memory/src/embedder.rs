// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding providers and the fallback chain.
//!
//! Three layers: remote HTTP providers (primary, then secondary), and a
//! deterministic local hash embedder that cannot fail. The
//! [`EmbedderStack`] walks that chain per call with a timeout on each
//! remote attempt and a semaphore bounding concurrent embed calls.
//! Fallback vectors carry `provider_id = "local-fallback"` so backfill can
//! find and replace them later.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use mnemo_config::model::{EmbeddingConfig, RemoteEmbeddingConfig};
use mnemo_core::types::{
    AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus, QueryEmbedding,
};
use mnemo_core::{EmbeddingProvider, MnemoError, PluginAdapter};

/// Provider identity of the deterministic local fallback.
pub const LOCAL_FALLBACK_ID: &str = "local-fallback";

/// Scale a vector to unit length. Zero vectors are left untouched.
pub fn l2_normalize(vec: &mut [f32]) {
    let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in vec.iter_mut() {
            *x /= norm;
        }
    }
}

/// Deterministic hash-based embedder.
///
/// Expands SHA-256 digests of the input text into a fixed-dimension,
/// L2-normalized vector. Identical text always yields identical vectors,
/// which keeps dedup and retrieval self-consistent while real providers
/// are down. The vectors carry no semantics; they exist so the pipeline
/// never stalls on a provider outage.
pub struct LocalHashEmbedder {
    dimensions: usize,
}

impl LocalHashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn hash_vector(&self, text: &str) -> Vec<f32> {
        let mut vec = Vec::with_capacity(self.dimensions);
        let mut counter: u32 = 0;
        'fill: loop {
            let mut hasher = Sha256::new();
            hasher.update(text.as_bytes());
            hasher.update(counter.to_le_bytes());
            let digest = hasher.finalize();
            for chunk in digest.chunks_exact(4) {
                if vec.len() == self.dimensions {
                    break 'fill;
                }
                let n = u32::from_le_bytes(chunk.try_into().expect("chunk is 4 bytes"));
                vec.push((n as f32 / u32::MAX as f32) * 2.0 - 1.0);
            }
            counter += 1;
        }
        l2_normalize(&mut vec);
        vec
    }
}

#[async_trait]
impl PluginAdapter for LocalHashEmbedder {
    fn name(&self) -> &str {
        "local-hash-embedder"
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
impl EmbeddingProvider for LocalHashEmbedder {
    fn provider_id(&self) -> &str {
        LOCAL_FALLBACK_ID
    }

    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, MnemoError> {
        let embeddings = input.texts.iter().map(|t| self.hash_vector(t)).collect();
        Ok(EmbeddingOutput {
            embeddings,
            dimensions: self.dimensions,
            provider_id: LOCAL_FALLBACK_ID.to_string(),
        })
    }

    async fn embed_query(&self, text: &str) -> Result<QueryEmbedding, MnemoError> {
        Ok(QueryEmbedding {
            vector: self.hash_vector(text),
            provider_id: LOCAL_FALLBACK_ID.to_string(),
        })
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Remote embedding model over HTTP.
///
/// Posts `{"input": [..]}` and expects `{"embeddings": [[..]]}` with one
/// vector per input, each of the configured dimensionality.
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    provider_id: String,
    endpoint: String,
    api_key: Option<String>,
    dimensions: usize,
}

impl HttpEmbeddingProvider {
    pub fn new(config: &RemoteEmbeddingConfig, dimensions: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            provider_id: config.provider_id.clone(),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            dimensions,
        }
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MnemoError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&EmbedRequest { input: texts });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| MnemoError::Provider {
            message: format!("embedding request to {} failed", self.provider_id),
            source: Some(Box::new(e)),
        })?;
        let response = response
            .error_for_status()
            .map_err(|e| MnemoError::Provider {
                message: format!("embedding provider {} returned error status", self.provider_id),
                source: Some(Box::new(e)),
            })?;
        let body: EmbedResponse = response.json().await.map_err(|e| MnemoError::Provider {
            message: format!("embedding provider {} returned malformed body", self.provider_id),
            source: Some(Box::new(e)),
        })?;

        if body.embeddings.len() != texts.len() {
            return Err(MnemoError::Provider {
                message: format!(
                    "embedding provider {} returned {} vectors for {} inputs",
                    self.provider_id,
                    body.embeddings.len(),
                    texts.len()
                ),
                source: None,
            });
        }
        for vector in &body.embeddings {
            if vector.len() != self.dimensions {
                return Err(MnemoError::Provider {
                    message: format!(
                        "embedding provider {} returned dimension {} (expected {})",
                        self.provider_id,
                        vector.len(),
                        self.dimensions
                    ),
                    source: None,
                });
            }
        }
        Ok(body.embeddings)
    }
}

#[async_trait]
impl PluginAdapter for HttpEmbeddingProvider {
    fn name(&self) -> &str {
        &self.provider_id
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        // A cheap one-token embed doubles as the liveness probe.
        match self.request(&["ping".to_string()]).await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, MnemoError> {
        let embeddings = self.request(&input.texts).await?;
        Ok(EmbeddingOutput {
            embeddings,
            dimensions: self.dimensions,
            provider_id: self.provider_id.clone(),
        })
    }

    async fn embed_query(&self, text: &str) -> Result<QueryEmbedding, MnemoError> {
        let texts = [text.to_string()];
        let mut embeddings = self.request(&texts).await?;
        Ok(QueryEmbedding {
            vector: embeddings.remove(0),
            provider_id: self.provider_id.clone(),
        })
    }
}

/// The provider chain: primary, then secondary, then the local fallback.
///
/// Every remote attempt runs under the configured per-call timeout. The
/// semaphore bounds concurrent embed calls across the whole process, which
/// is what keeps backfill from hammering a rate-limited upstream.
pub struct EmbedderStack {
    remotes: Vec<Arc<dyn EmbeddingProvider>>,
    fallback: LocalHashEmbedder,
    timeout: Duration,
    semaphore: Semaphore,
}

impl EmbedderStack {
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        let mut remotes: Vec<Arc<dyn EmbeddingProvider>> = Vec::new();
        for remote in [&config.primary, &config.secondary].into_iter().flatten() {
            remotes.push(Arc::new(HttpEmbeddingProvider::new(remote, config.dimensions)));
        }
        Self {
            remotes,
            fallback: LocalHashEmbedder::new(config.dimensions),
            timeout: Duration::from_secs(config.timeout_secs),
            semaphore: Semaphore::new(config.parallelism.max(1)),
        }
    }

    /// Stack with explicit providers, used by tests and custom wiring.
    pub fn with_providers(
        remotes: Vec<Arc<dyn EmbeddingProvider>>,
        dimensions: usize,
        timeout: Duration,
        parallelism: usize,
    ) -> Self {
        Self {
            remotes,
            fallback: LocalHashEmbedder::new(dimensions),
            timeout,
            semaphore: Semaphore::new(parallelism.max(1)),
        }
    }

    async fn acquire(&self) -> Result<tokio::sync::SemaphorePermit<'_>, MnemoError> {
        self.semaphore
            .acquire()
            .await
            .map_err(|_| MnemoError::Internal("embedder semaphore closed".to_string()))
    }

    async fn with_timeout<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, MnemoError>>,
    ) -> Result<T, MnemoError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(MnemoError::Timeout {
                duration: self.timeout,
            }),
        }
    }
}

#[async_trait]
impl PluginAdapter for EmbedderStack {
    fn name(&self) -> &str {
        "embedder-stack"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        if self.remotes.is_empty() {
            return Ok(HealthStatus::Degraded(
                "no remote embedding provider configured".to_string(),
            ));
        }
        for remote in &self.remotes {
            if let Ok(HealthStatus::Healthy) = remote.health_check().await {
                return Ok(HealthStatus::Healthy);
            }
        }
        Ok(HealthStatus::Degraded(
            "all remote embedding providers unreachable".to_string(),
        ))
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingProvider for EmbedderStack {
    /// The identity the stack prefers to produce. Individual outputs carry
    /// the provider that actually served them.
    fn provider_id(&self) -> &str {
        self.remotes
            .first()
            .map(|r| r.provider_id())
            .unwrap_or(LOCAL_FALLBACK_ID)
    }

    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, MnemoError> {
        let _permit = self.acquire().await?;
        for remote in &self.remotes {
            match self.with_timeout(remote.embed(input.clone())).await {
                Ok(output) => return Ok(output),
                Err(err) => {
                    warn!(provider = remote.provider_id(), error = %err,
                        "embedding provider failed, trying next");
                }
            }
        }
        debug!("all remote providers exhausted, using local fallback");
        self.fallback.embed(input).await
    }

    async fn embed_query(&self, text: &str) -> Result<QueryEmbedding, MnemoError> {
        let _permit = self.acquire().await?;
        for remote in &self.remotes {
            match self.with_timeout(remote.embed_query(text)).await {
                Ok(query) => return Ok(query),
                Err(err) => {
                    warn!(provider = remote.provider_id(), error = %err,
                        "embedding provider failed, trying next");
                }
            }
        }
        self.fallback.embed_query(text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_vectors_are_deterministic_and_normalized() {
        let embedder = LocalHashEmbedder::new(384);
        let a = embedder.embed_query("the same text").await.unwrap();
        let b = embedder.embed_query("the same text").await.unwrap();
        assert_eq!(a.vector, b.vector);
        assert_eq!(a.vector.len(), 384);
        assert_eq!(a.provider_id, LOCAL_FALLBACK_ID);

        let norm: f32 = a.vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5, "norm was {norm}");
    }

    #[tokio::test]
    async fn different_texts_produce_different_vectors() {
        let embedder = LocalHashEmbedder::new(64);
        let a = embedder.embed_query("coffee in the morning").await.unwrap();
        let b = embedder.embed_query("tea in the evening").await.unwrap();
        assert_ne!(a.vector, b.vector);
    }

    #[tokio::test]
    async fn batch_embed_matches_query_embed() {
        let embedder = LocalHashEmbedder::new(32);
        let batch = embedder
            .embed(EmbeddingInput {
                texts: vec!["one".to_string(), "two".to_string()],
            })
            .await
            .unwrap();
        assert_eq!(batch.embeddings.len(), 2);
        assert_eq!(batch.dimensions, 32);

        let single = embedder.embed_query("one").await.unwrap();
        assert_eq!(batch.embeddings[0], single.vector);
    }

    #[test]
    fn l2_normalize_leaves_zero_vector() {
        let mut v = vec![0.0_f32; 4];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0; 4]);
    }

    #[tokio::test]
    async fn empty_stack_uses_fallback() {
        let stack = EmbedderStack::with_providers(vec![], 16, Duration::from_secs(1), 2);
        let query = stack.embed_query("hello").await.unwrap();
        assert_eq!(query.provider_id, LOCAL_FALLBACK_ID);
        assert_eq!(query.vector.len(), 16);
        assert_eq!(stack.provider_id(), LOCAL_FALLBACK_ID);
    }

    fn remote_config(endpoint: String) -> RemoteEmbeddingConfig {
        RemoteEmbeddingConfig {
            provider_id: "test-model".to_string(),
            endpoint,
            api_key: Some("secret".to_string()),
        }
    }

    #[tokio::test]
    async fn http_provider_round_trips_an_embed_call() {
        use wiremock::matchers::{header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": [[0.25, 0.5, -0.25, 1.0]]
            })))
            .mount(&server)
            .await;

        let provider =
            HttpEmbeddingProvider::new(&remote_config(format!("{}/embed", server.uri())), 4);
        let output = provider
            .embed(EmbeddingInput {
                texts: vec!["hi".to_string()],
            })
            .await
            .unwrap();
        assert_eq!(output.embeddings, vec![vec![0.25, 0.5, -0.25, 1.0]]);
        assert_eq!(output.provider_id, "test-model");
        assert_eq!(output.dimensions, 4);
    }

    #[tokio::test]
    async fn http_provider_rejects_wrong_dimensionality() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": [[0.25, 0.5]]
            })))
            .mount(&server)
            .await;

        let provider = HttpEmbeddingProvider::new(&remote_config(server.uri()), 4);
        let err = provider.embed_query("hi").await.unwrap_err();
        assert!(matches!(err, MnemoError::Provider { .. }));
    }

    #[tokio::test]
    async fn stack_falls_back_when_the_remote_errors() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let remote: Arc<dyn EmbeddingProvider> =
            Arc::new(HttpEmbeddingProvider::new(&remote_config(server.uri()), 8));
        let stack =
            EmbedderStack::with_providers(vec![remote], 8, Duration::from_secs(1), 2);
        // The stack still advertises the remote identity it prefers.
        assert_eq!(stack.provider_id(), "test-model");

        let query = stack.embed_query("hello").await.unwrap();
        assert_eq!(query.provider_id, LOCAL_FALLBACK_ID);
        assert_eq!(query.vector.len(), 8);
    }
}
