//! Content-addressed embedding memoization.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use moka::future::Cache;
use wayfarer_llm::{LlmError, LlmProvider};

use crate::error::{Result, RetrievalError};

/// Hit/miss counters of an [`EmbeddingCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Bounded text→vector cache in front of an embedding provider.
///
/// Keys are blake3 hashes of the text. Concurrent misses for the same key share a
/// single provider call; failed computations are never stored. Every vector handed
/// out has exactly `dimension` components.
pub struct EmbeddingCache<P> {
    provider: Arc<P>,
    dimension: usize,
    entries: Cache<String, Vec<f32>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<P> std::fmt::Debug for EmbeddingCache<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingCache")
            .field("dimension", &self.dimension)
            .field("entries", &self.entries.entry_count())
            .finish_non_exhaustive()
    }
}

impl<P: LlmProvider> EmbeddingCache<P> {
    #[must_use]
    pub fn new(provider: Arc<P>, dimension: usize, capacity: u64) -> Self {
        Self {
            provider,
            dimension,
            entries: Cache::builder().max_capacity(capacity).build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Return the embedding for `text`, computing it on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Embedding`] if the provider fails. The failure is
    /// not cached; the next call retries the provider.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let key = content_key(text);

        if let Some(hit) = self.entries.get(&key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(hit);
        }

        let dimension = self.dimension;
        self.entries
            .try_get_with(key, async {
                self.misses.fetch_add(1, Ordering::Relaxed);
                let raw = self.provider.embed(text).await?;
                Ok::<_, LlmError>(fit_dimension(raw, dimension))
            })
            .await
            .map_err(RetrievalError::Embedding)
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Stable cache key for a text: hex blake3 digest, bounded at 64 bytes.
#[must_use]
pub fn content_key(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

/// Zero-pad or truncate `vector` to exactly `dimension` components.
#[must_use]
pub fn fit_dimension(mut vector: Vec<f32>, dimension: usize) -> Vec<f32> {
    if vector.len() != dimension {
        tracing::debug!(
            actual = vector.len(),
            expected = dimension,
            "fitting embedding to index dimension"
        );
        vector.resize(dimension, 0.0);
    }
    vector
}

#[cfg(test)]
mod tests {
    use wayfarer_llm::mock::MockProvider;

    use super::*;

    fn cache_with(provider: MockProvider, dimension: usize) -> EmbeddingCache<MockProvider> {
        EmbeddingCache::new(Arc::new(provider), dimension, 128)
    }

    #[test]
    fn fit_pads_short_vectors() {
        let v = fit_dimension(vec![1.0, 2.0], 4);
        assert_eq!(v, vec![1.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn fit_truncates_long_vectors() {
        let v = fit_dimension(vec![1.0, 2.0, 3.0], 2);
        assert_eq!(v, vec![1.0, 2.0]);
    }

    #[test]
    fn content_key_is_stable_and_bounded() {
        let long = "x".repeat(10_000);
        assert_eq!(content_key(&long), content_key(&long));
        assert_eq!(content_key(&long).len(), 64);
        assert_ne!(content_key("hanoi"), content_key("Hanoi"));
    }

    #[tokio::test]
    async fn embeddings_match_configured_dimension() {
        let cache = cache_with(MockProvider::default().with_embedding(vec![0.5; 384]), 1024);
        let v = cache.embed("street food in hanoi").await.unwrap();
        assert_eq!(v.len(), 1024);
        assert!(v[384..].iter().all(|x| *x == 0.0));

        let cache = cache_with(MockProvider::default().with_embedding(vec![0.5; 2048]), 1024);
        assert_eq!(cache.embed("x").await.unwrap().len(), 1024);
    }

    #[tokio::test]
    async fn repeated_text_hits_cache() {
        let provider = MockProvider::default().with_embedding(vec![0.25, 0.75]);
        let cache = cache_with(provider.clone(), 2);

        let first = cache.embed("beach in nha trang").await.unwrap();
        let second = cache.embed("beach in nha trang").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.embed_calls(), 1);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[tokio::test]
    async fn concurrent_duplicates_invoke_provider_once() {
        let provider = MockProvider::default()
            .with_embedding(vec![1.0; 8])
            .with_delay(20);
        let cache = cache_with(provider.clone(), 8);

        let (a, b, c) = tokio::join!(
            cache.embed("mekong delta"),
            cache.embed("mekong delta"),
            cache.embed("mekong delta"),
        );

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(c.unwrap().len(), 8);
        assert_eq!(provider.embed_calls(), 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let provider = MockProvider::default().with_failing_embed();
        let cache = cache_with(provider.clone(), 4);

        assert!(matches!(
            cache.embed("sapa").await,
            Err(RetrievalError::Embedding(_))
        ));
        assert!(cache.embed("sapa").await.is_err());
        assert_eq!(provider.embed_calls(), 2);
    }
}
