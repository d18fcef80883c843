use lazy_static::lazy_static;
use rayon::prelude::*;
use regex::Regex;
use sha2::{Digest, Sha256};

use super::{truncate_tokens, EmbeddingProvider};
use crate::error::EmbeddingError;

lazy_static! {
    // Word tokens: runs of letters/digits, Unicode-aware
    static ref TOKEN_PATTERN: Regex = Regex::new(r"\w+").unwrap();
}

/// Local embedder based on signed feature hashing of unigrams and bigrams.
///
/// Deterministic across runs and machines: identical text always yields an
/// identical vector, and vectors are L2-normalized (empty text gives the
/// zero vector).
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    max_tokens: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize, max_tokens: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            max_tokens,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let text = truncate_tokens(text, self.max_tokens).to_lowercase();
        let tokens: Vec<&str> = TOKEN_PATTERN.find_iter(&text).map(|m| m.as_str()).collect();

        let mut vector = vec![0.0f32; self.dimension];
        for token in &tokens {
            self.accumulate(&mut vector, token.as_bytes(), 1.0);
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            self.accumulate(&mut vector, bigram.as_bytes(), 0.5);
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }

    fn accumulate(&self, vector: &mut [f32], feature: &[u8], weight: f32) {
        let digest = Sha256::digest(feature);
        let mut bucket_bytes = [0u8; 8];
        bucket_bytes.copy_from_slice(&digest[..8]);
        let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

impl EmbeddingProvider for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.par_iter().map(|text| self.embed_one(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_and_normalized() {
        let embedder = HashingEmbedder::new(64, 512);
        let a = embedder.embed("Graph neural networks for citation prediction").unwrap();
        let b = embedder.embed("Graph neural networks for citation prediction").unwrap();

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_case_and_punctuation_insensitive() {
        let embedder = HashingEmbedder::new(64, 512);
        let a = embedder.embed("Citation graphs, PageRank!").unwrap();
        let b = embedder.embed("citation graphs pagerank").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(8, 512);
        let v = embedder.embed("   ").unwrap();
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_truncation_ignores_tail() {
        let embedder = HashingEmbedder::new(64, 3);
        let a = embedder.embed("one two three").unwrap();
        let b = embedder.embed("one two three four five").unwrap();
        assert_eq!(a, b);
    }
}
