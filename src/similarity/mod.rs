//! Dense pairwise cosine similarity over corpus embeddings.
//!
//! The full N×N matrix is materialized: memory grows as 4·N² bytes, which
//! caps practical corpora at low tens of thousands of papers. No
//! approximate neighbour search is used since it would change rankings.

use log::{debug, info};
use rayon::prelude::*;
use std::time::Instant;

use crate::common::{format_elapsed, Paper};
use crate::embedding::{embed_all, EmbeddingProvider, DEFAULT_BATCH_SIZE};
use crate::error::EmbeddingError;

/// Cosine similarity of two vectors.
///
/// A zero-norm vector (or a length mismatch) has no direction, so the
/// similarity is defined as 0.0 instead of dividing by zero.
pub fn cosine_similarity(u: &[f32], v: &[f32]) -> f32 {
    if u.len() != v.len() {
        return 0.0;
    }
    let norm_u = l2_norm(u);
    let norm_v = l2_norm(v);
    cosine_with_norms(u, norm_u, v, norm_v)
}

fn l2_norm(v: &[f32]) -> f64 {
    v.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>().sqrt()
}

fn cosine_with_norms(u: &[f32], norm_u: f64, v: &[f32], norm_v: f64) -> f32 {
    if norm_u == 0.0 || norm_v == 0.0 || u.len() != v.len() {
        return 0.0;
    }
    let dot: f64 = u.iter().zip(v).map(|(&a, &b)| a as f64 * b as f64).sum();
    (dot / (norm_u * norm_v)).clamp(-1.0, 1.0) as f32
}

/// Square, symmetric similarity matrix in row-major order
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    size: usize,
    values: Vec<f32>,
}

impl SimilarityMatrix {
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.values[i * self.size + j]
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.values[i * self.size..(i + 1) * self.size]
    }
}

/// Corpus embeddings plus their pairwise similarity matrix
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    embeddings: Vec<Vec<f32>>,
    norms: Vec<f64>,
    matrix: SimilarityMatrix,
    degenerate: usize,
}

impl SimilarityIndex {
    /// Embed every paper abstract once and build the similarity matrix
    pub fn build<P: EmbeddingProvider + ?Sized>(
        papers: &[Paper],
        provider: &P,
    ) -> Result<Self, EmbeddingError> {
        Self::build_with_batch_size(papers, provider, DEFAULT_BATCH_SIZE)
    }

    pub fn build_with_batch_size<P: EmbeddingProvider + ?Sized>(
        papers: &[Paper],
        provider: &P,
        batch_size: usize,
    ) -> Result<Self, EmbeddingError> {
        let texts: Vec<String> = papers.iter().map(|p| p.abstract_text.clone()).collect();
        let embeddings = embed_all(provider, &texts, batch_size)?;
        Ok(Self::from_embeddings(embeddings))
    }

    /// Build from precomputed embeddings, one per paper in corpus order
    pub fn from_embeddings(embeddings: Vec<Vec<f32>>) -> Self {
        let start = Instant::now();
        let n = embeddings.len();
        let norms: Vec<f64> = embeddings.iter().map(|e| l2_norm(e)).collect();
        let degenerate = norms.iter().filter(|&&norm| norm == 0.0).count();
        if degenerate > 0 {
            debug!(
                "{} embeddings have zero norm; their similarities default to 0",
                degenerate
            );
        }

        // Upper triangle per row, mirrored afterwards so (i, j) == (j, i) exactly
        let upper: Vec<Vec<f32>> = (0..n)
            .into_par_iter()
            .map(|i| {
                (i + 1..n)
                    .map(|j| cosine_with_norms(&embeddings[i], norms[i], &embeddings[j], norms[j]))
                    .collect()
            })
            .collect();

        let mut values = vec![0.0f32; n * n];
        for (i, row) in upper.iter().enumerate() {
            values[i * n + i] = if norms[i] > 0.0 { 1.0 } else { 0.0 };
            for (offset, &sim) in row.iter().enumerate() {
                let j = i + 1 + offset;
                values[i * n + j] = sim;
                values[j * n + i] = sim;
            }
        }

        info!(
            "Built {}x{} similarity matrix in {}",
            n,
            n,
            format_elapsed(start.elapsed())
        );

        Self {
            embeddings,
            norms,
            matrix: SimilarityMatrix { size: n, values },
            degenerate,
        }
    }

    pub fn similarity_matrix(&self) -> &SimilarityMatrix {
        &self.matrix
    }

    pub fn similarity(&self, i: usize, j: usize) -> f32 {
        self.matrix.get(i, j)
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }

    /// Number of corpus embeddings with zero norm
    pub fn degenerate_count(&self) -> usize {
        self.degenerate
    }

    /// Similarity of `query` to every corpus paper, in corpus order
    pub fn similarity_against(&self, query: &[f32]) -> Vec<f32> {
        let query_norm = l2_norm(query);
        self.embeddings
            .par_iter()
            .zip(self.norms.par_iter())
            .map(|(e, &norm)| cosine_with_norms(query, query_norm, e, norm))
            .collect()
    }
}
