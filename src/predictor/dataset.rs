use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;
use std::collections::HashSet;

use crate::graph::CitationMatrix;
use crate::similarity::SimilarityMatrix;

/// How training pairs are drawn from the N×N pair space
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sampling {
    /// Every ordered pair (i, j), diagonal included
    Exhaustive,
    /// Every citing pair plus `ratio` × as many uniformly drawn non-citing pairs
    NegativeSampled { ratio: f64 },
}

/// Single-feature labelled pairs: similarity(i, j) → does i cite j
#[derive(Debug, Clone, Default)]
pub struct PairDataset {
    pub features: Vec<f64>,
    pub labels: Vec<u8>,
}

impl PairDataset {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&y| y == 1).count()
    }

    /// Build the dataset; both matrices must have the same size
    pub fn build(
        similarity: &SimilarityMatrix,
        citations: &CitationMatrix,
        sampling: Sampling,
        rng: &mut StdRng,
    ) -> Self {
        let n = similarity.size();
        let total = n * n;
        let positives = citations.nnz();

        let dataset = match sampling {
            Sampling::NegativeSampled { ratio } => {
                let wanted = (positives as f64 * ratio.max(0.0)).round() as usize;
                if wanted >= total - positives {
                    Self::exhaustive(similarity, citations)
                } else {
                    Self::negative_sampled(similarity, citations, wanted, rng)
                }
            }
            Sampling::Exhaustive => Self::exhaustive(similarity, citations),
        };

        info!(
            "Training pairs: {} ({} citing, {:.4}% positive)",
            dataset.len(),
            dataset.positives(),
            100.0 * dataset.positives() as f64 / dataset.len().max(1) as f64
        );
        dataset
    }

    fn exhaustive(similarity: &SimilarityMatrix, citations: &CitationMatrix) -> Self {
        let n = similarity.size();
        let (features, labels): (Vec<f64>, Vec<u8>) = (0..n)
            .into_par_iter()
            .flat_map_iter(|i| {
                let row = similarity.row(i);
                (0..n).map(move |j| (row[j] as f64, citations.get(i, j)))
            })
            .unzip();
        Self { features, labels }
    }

    fn negative_sampled(
        similarity: &SimilarityMatrix,
        citations: &CitationMatrix,
        wanted: usize,
        rng: &mut StdRng,
    ) -> Self {
        let n = similarity.size();
        let mut features = Vec::with_capacity(citations.nnz() + wanted);
        let mut labels = Vec::with_capacity(citations.nnz() + wanted);

        for (i, j) in citations.iter() {
            features.push(similarity.get(i, j) as f64);
            labels.push(1);
        }

        let mut chosen = HashSet::with_capacity(wanted);
        while chosen.len() < wanted {
            let i = rng.gen_range(0..n);
            let j = rng.gen_range(0..n);
            if !citations.contains(i, j) && chosen.insert((i, j)) {
                features.push(similarity.get(i, j) as f64);
                labels.push(0);
            }
        }

        Self { features, labels }
    }

    /// Split off `test_fraction` of the pairs for evaluation, stratified by
    /// label: each class is shuffled on its own and contributes its share
    /// of the test pairs, and at least one pair of every class present stays
    /// in training. Returns (train, test); `test` is empty when no split is
    /// possible.
    pub fn split(self, test_fraction: f64, rng: &mut StdRng) -> (PairDataset, PairDataset) {
        let n = self.len();
        let n_test = if n < 2 {
            0
        } else {
            ((n as f64 * test_fraction.clamp(0.0, 1.0)).ceil() as usize).min(n - 1)
        };
        if n_test == 0 {
            return (self, PairDataset::default());
        }

        let (mut positives, mut negatives): (Vec<usize>, Vec<usize>) =
            (0..n).partition(|&k| self.labels[k] == 1);
        positives.shuffle(rng);
        negatives.shuffle(rng);

        let p = positives.len();
        let mut test_positives = (n_test as f64 * p as f64 / n as f64).round() as usize;
        if p >= 2 {
            test_positives = test_positives.max(1);
        }
        let test_positives = test_positives.min(p.saturating_sub(1));
        let test_negatives = (n_test - test_positives).min(negatives.len().saturating_sub(1));

        let take = |indices: &[usize], other: &[usize]| PairDataset {
            features: indices.iter().chain(other).map(|&k| self.features[k]).collect(),
            labels: indices.iter().chain(other).map(|&k| self.labels[k]).collect(),
        };
        let test = take(&positives[..test_positives], &negatives[..test_negatives]);
        let train = take(&positives[test_positives..], &negatives[test_negatives..]);
        (train, test)
    }
}
