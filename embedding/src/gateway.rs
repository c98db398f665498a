//! C2 Embedding Gateway: batched vector encoding with caching (spec.md §4.2).

use std::sync::Arc;

use async_trait::async_trait;
use conhub_models::chunk::DEFAULT_VECTOR_DIM;
use conhub_ports::cache::CachePort;
use conhub_ports::embedding::EmbeddingModelPort;
use conhub_ports::{PortError, PortResult};
use sha2::{Digest, Sha256};
use tokio::sync::Semaphore;

/// Raw provider call, implemented per backend (OpenAI, local model, etc).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;
    fn dimension(&self) -> usize;
    async fn embed_one(&self, text: &str) -> PortResult<Vec<f32>>;
}

const DEFAULT_CACHE_TTL_SECONDS: u64 = 24 * 60 * 60;

/// Generalizes `embedding/src/services/embedding.rs`'s single gateway
/// struct: gates provider calls behind a semaphore and caches by content
/// hash, matching the Redis-backed `QueryCache` idiom.
pub struct EmbeddingGateway {
    provider: Arc<dyn EmbeddingProvider>,
    model_name: String,
    cache: Option<Arc<dyn CachePort>>,
    cache_ttl_seconds: u64,
    semaphore: Arc<Semaphore>,
}

impl EmbeddingGateway {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        model_name: impl Into<String>,
        cache: Option<Arc<dyn CachePort>>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            provider,
            model_name: model_name.into(),
            cache,
            cache_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            semaphore: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    pub fn with_cache_ttl_seconds(mut self, ttl: u64) -> Self {
        self.cache_ttl_seconds = ttl;
        self
    }

    fn cache_key(&self, normalized_text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.provider.name().as_bytes());
        hasher.update(b"|");
        hasher.update(self.model_name.as_bytes());
        hasher.update(b"|");
        hasher.update(normalized_text.as_bytes());
        format!("embed:{:x}", hasher.finalize())
    }

    async fn embed_one_cached(&self, text: &str) -> PortResult<Vec<f32>> {
        if text.is_empty() {
            return Ok(vec![0.0; self.provider.dimension()]);
        }
        let normalized = text.trim();
        let key = self.cache_key(normalized);

        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(&key).await? {
                if let Ok(vector) = serde_json::from_slice::<Vec<f32>>(&cached) {
                    return Ok(vector);
                }
            }
        }

        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| PortError::internal(e.to_string()))?;
        let vector = self.provider.embed_one(normalized).await;
        drop(permit);
        let vector = vector?;

        if let Some(cache) = &self.cache {
            if let Ok(encoded) = serde_json::to_vec(&vector) {
                cache.set(&key, encoded, self.cache_ttl_seconds).await?;
            }
        }
        Ok(vector)
    }
}

#[async_trait]
impl EmbeddingModelPort for EmbeddingGateway {
    fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    async fn embed(&self, text: &str) -> PortResult<Vec<f32>> {
        self.embed_one_cached(text).await
    }

    /// Submits only cache misses to the model, re-interleaving results back
    /// into their original positions.
    async fn embed_batch(&self, texts: &[String]) -> PortResult<Vec<Vec<f32>>> {
        let mut results: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let mut misses: Vec<usize> = Vec::new();

        for (index, text) in texts.iter().enumerate() {
            if text.is_empty() {
                results[index] = Some(vec![0.0; self.provider.dimension()]);
                continue;
            }
            let normalized = text.trim();
            let key = self.cache_key(normalized);
            if let Some(cache) = &self.cache {
                if let Some(cached) = cache.get(&key).await? {
                    if let Ok(vector) = serde_json::from_slice::<Vec<f32>>(&cached) {
                        results[index] = Some(vector);
                        continue;
                    }
                }
            }
            misses.push(index);
        }

        let mut handles = Vec::with_capacity(misses.len());
        for &index in &misses {
            let text = texts[index].clone();
            let gateway_self: &Self = self;
            handles.push(async move { (index, gateway_self.embed_one_cached(&text).await) });
        }
        let computed = futures::future::join_all(handles).await;
        for (index, vector) in computed {
            results[index] = Some(vector?);
        }

        Ok(results
            .into_iter()
            .map(|v| v.unwrap_or_else(|| vec![0.0; DEFAULT_VECTOR_DIM]))
            .collect())
    }
}

/// Static no-op provider used when no real backend is configured; keeps
/// dimension parity with `DEFAULT_VECTOR_DIM` for local development.
pub struct NullEmbeddingProvider {
    dim: usize,
}

impl NullEmbeddingProvider {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

#[async_trait]
impl EmbeddingProvider for NullEmbeddingProvider {
    fn name(&self) -> &str {
        "null"
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    async fn embed_one(&self, text: &str) -> PortResult<Vec<f32>> {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let digest = hasher.finalize();
        let mut vector = Vec::with_capacity(self.dim);
        for i in 0..self.dim {
            let byte = digest[i % digest.len()];
            vector.push((byte as f32 / 255.0) * 2.0 - 1.0);
        }
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingProvider {
        calls: std::sync::atomic::AtomicUsize,
        dim: usize,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }
        fn dimension(&self) -> usize {
            self.dim
        }
        async fn embed_one(&self, text: &str) -> PortResult<Vec<f32>> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(vec![text.len() as f32; self.dim])
        }
    }

    #[tokio::test]
    async fn empty_input_returns_zero_vector() {
        let provider = Arc::new(CountingProvider { calls: Default::default(), dim: 4 });
        let gateway = EmbeddingGateway::new(provider, "test-model", None, 2);
        let v = gateway.embed("").await.unwrap();
        assert_eq!(v, vec![0.0, 0.0, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn batch_preserves_index_order_with_mixed_empty_inputs() {
        let provider = Arc::new(CountingProvider { calls: Default::default(), dim: 3 });
        let gateway = EmbeddingGateway::new(provider, "test-model", None, 2);
        let texts = vec!["ab".to_string(), "".to_string(), "abcd".to_string()];
        let vectors = gateway.embed_batch(&texts).await.unwrap();
        assert_eq!(vectors[0], vec![2.0, 2.0, 2.0]);
        assert_eq!(vectors[1], vec![0.0, 0.0, 0.0]);
        assert_eq!(vectors[2], vec![4.0, 4.0, 4.0]);
    }
}
