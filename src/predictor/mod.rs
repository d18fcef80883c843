//! Supervised citation-link predictor.
//!
//! One feature (embedding similarity of the pair), one label (does the
//! first paper cite the second), one logistic model. Because the model is
//! a monotone transform of similarity, ranking by probability equals
//! ranking by similarity whenever the learned coefficient is positive.

mod dataset;
mod logistic;
mod metrics;

pub use dataset::{PairDataset, Sampling};
pub use logistic::{sigmoid, LogisticFit, LogisticRegression};
pub use metrics::roc_auc;

use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;
use std::time::Instant;

use crate::common::format_elapsed;
use crate::error::PredictorError;
use crate::graph::CitationMatrix;
use crate::similarity::SimilarityMatrix;

/// Training settings
#[derive(Debug, Clone)]
pub struct PredictorConfig {
    /// Inverse L2 regularization strength
    pub c: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Share of pairs held out for ROC-AUC; 0 disables evaluation
    pub test_fraction: f64,
    pub seed: u64,
    pub sampling: Sampling,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            tolerance: 1e-8,
            max_iterations: 100,
            test_fraction: 0.2,
            seed: 42,
            sampling: Sampling::Exhaustive,
        }
    }
}

/// Held-out evaluation of the fitted model
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub train_pairs: usize,
    pub train_positives: usize,
    pub test_pairs: usize,
    pub test_positives: usize,
    /// `None` when the held-out pairs lack one of the classes
    pub roc_auc: Option<f64>,
}

/// Learned citation model, read-only after training
#[derive(Debug, Clone, Serialize)]
pub struct TrainedClassifier {
    pub coefficient: f64,
    pub intercept: f64,
    pub iterations: usize,
    /// Pairs drawn before the train/test split
    pub pairs: usize,
    pub evaluation: Option<Evaluation>,
}

impl TrainedClassifier {
    pub fn probability(&self, similarity: f32) -> f64 {
        sigmoid(self.coefficient * similarity as f64 + self.intercept)
    }

    /// Citation probability for each similarity score, in input order
    pub fn predict_probability(&self, similarities: &[f32]) -> Vec<f64> {
        similarities.par_iter().map(|&s| self.probability(s)).collect()
    }
}

pub struct CitationPredictor {
    config: PredictorConfig,
}

impl CitationPredictor {
    pub fn new(config: PredictorConfig) -> Self {
        Self { config }
    }

    /// Fit the model once on the training split and report ROC-AUC on the
    /// held-out split. The held-out pairs are never used to pick a model.
    pub fn train(
        &self,
        similarity: &SimilarityMatrix,
        citations: &CitationMatrix,
    ) -> Result<TrainedClassifier, PredictorError> {
        if similarity.size() != citations.size() {
            return Err(PredictorError::ShapeMismatch {
                similarity: similarity.size(),
                citation: citations.size(),
            });
        }

        let start = Instant::now();
        let mut rng = StdRng::seed_from_u64(self.config.seed);

        let dataset = PairDataset::build(similarity, citations, self.config.sampling, &mut rng);
        if dataset.is_empty() {
            return Err(PredictorError::Empty);
        }
        let pairs = dataset.len();
        let (train, test) = dataset.split(self.config.test_fraction, &mut rng);

        let solver = LogisticRegression {
            c: self.config.c,
            tolerance: self.config.tolerance,
            max_iterations: self.config.max_iterations,
        };
        let fit = solver.fit(&train.features, &train.labels)?;

        if fit.coefficient <= 0.0 {
            warn!(
                "Learned similarity coefficient {:.4} is not positive; higher similarity will rank lower",
                fit.coefficient
            );
        }

        let mut classifier = TrainedClassifier {
            coefficient: fit.coefficient,
            intercept: fit.intercept,
            iterations: fit.iterations,
            pairs,
            evaluation: None,
        };

        if !test.is_empty() {
            let scores: Vec<f64> = test
                .features
                .par_iter()
                .map(|&x| sigmoid(fit.coefficient * x + fit.intercept))
                .collect();
            let auc = roc_auc(&scores, &test.labels);
            match auc {
                Some(auc) => info!("Held-out ROC-AUC: {:.4} over {} pairs", auc, test.len()),
                None => warn!("Held-out split has a single class; ROC-AUC is undefined"),
            }
            classifier.evaluation = Some(Evaluation {
                train_pairs: train.len(),
                train_positives: train.positives(),
                test_pairs: test.len(),
                test_positives: test.positives(),
                roc_auc: auc,
            });
        }

        info!(
            "Trained citation predictor (coefficient {:.4}, intercept {:.4}) in {}",
            classifier.coefficient,
            classifier.intercept,
            format_elapsed(start.elapsed())
        );

        Ok(classifier)
    }
}
