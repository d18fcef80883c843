use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::EmbeddingProvider;
use crate::error::EmbeddingError;

/// Per-run memo in front of a provider: each distinct text reaches the
/// inner provider at most once.
pub struct CachedEmbedder<P> {
    inner: P,
    cache: Mutex<HashMap<String, Vec<f32>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<P: EmbeddingProvider> CachedEmbedder<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn cached_len(&self) -> usize {
        self.cache.lock().len()
    }

    /// (hits, misses) so far
    pub fn stats(&self) -> (usize, usize) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }
}

impl<P: EmbeddingProvider> EmbeddingProvider for CachedEmbedder<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let missing: Vec<String> = {
            let cache = self.cache.lock();
            let mut seen = std::collections::HashSet::new();
            texts
                .iter()
                .filter(|t| !cache.contains_key(*t) && seen.insert(t.as_str()))
                .cloned()
                .collect()
        };

        self.hits.fetch_add(texts.len() - missing.len(), Ordering::Relaxed);
        self.misses.fetch_add(missing.len(), Ordering::Relaxed);

        if !missing.is_empty() {
            debug!("Embedding {} uncached texts", missing.len());
            // Lock is released while the provider runs
            let vectors = self.inner.embed_batch(&missing)?;
            if vectors.len() != missing.len() {
                return Err(EmbeddingError::Response(format!(
                    "expected {} vectors, got {}",
                    missing.len(),
                    vectors.len()
                )));
            }
            let mut cache = self.cache.lock();
            for (text, vector) in missing.into_iter().zip(vectors) {
                cache.insert(text, vector);
            }
        }

        let cache = self.cache.lock();
        texts
            .iter()
            .map(|t| {
                cache
                    .get(t)
                    .cloned()
                    .ok_or_else(|| EmbeddingError::Response(format!("no vector cached for '{}'", t)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counting {
        calls: AtomicUsize,
        texts: AtomicUsize,
    }

    impl EmbeddingProvider for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.texts.fetch_add(texts.len(), Ordering::SeqCst);
            Ok(texts.iter().map(|t| vec![t.len() as f32]).collect())
        }
    }

    fn counting() -> Counting {
        Counting {
            calls: AtomicUsize::new(0),
            texts: AtomicUsize::new(0),
        }
    }

    #[test]
    fn test_each_text_embedded_once() {
        let cached = CachedEmbedder::new(counting());
        let batch = vec!["a".to_string(), "bb".to_string(), "a".to_string()];

        let first = cached.embed_batch(&batch).unwrap();
        assert_eq!(first, vec![vec![1.0], vec![2.0], vec![1.0]]);
        assert_eq!(cached.inner.texts.load(Ordering::SeqCst), 2);

        let second = cached.embed_batch(&batch).unwrap();
        assert_eq!(first, second);
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cached.cached_len(), 2);
        assert_eq!(cached.stats(), (4, 2));
    }

    struct Refusing;

    impl EmbeddingProvider for Refusing {
        fn name(&self) -> &str {
            "refusing"
        }

        fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Err(EmbeddingError::Timeout(30))
        }
    }

    #[test]
    fn test_failure_is_not_cached() {
        let cached = CachedEmbedder::new(Refusing);
        let result = cached.embed("hello");
        assert!(matches!(result, Err(EmbeddingError::Timeout(30))));
        assert_eq!(cached.cached_len(), 0);
        assert!(cached.embed("hello").is_err());
    }

    #[test]
    fn test_single_embed_uses_cache() {
        let cached = CachedEmbedder::new(counting());
        cached.embed("hello").unwrap();
        cached.embed("hello").unwrap();
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 1);
    }
}
