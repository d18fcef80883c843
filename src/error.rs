//! Error types for the library layer.
//!
//! Commands wrap these in `anyhow` with context; the library itself
//! returns typed errors so callers can tell integrity failures from
//! embedding failures.

use thiserror::Error;

/// Citation graph construction errors
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("integrity error: {0}")]
    Integrity(String),
}

/// Errors raised by an embedding provider. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Request(String),

    #[error("embedding service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid embedding response: {0}")]
    Response(String),

    #[error("embedding request timed out after {0}s")]
    Timeout(u64),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("failed to start embedding runtime: {0}")]
    Runtime(String),
}

/// Citation predictor training errors
#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("training set is empty")]
    Empty,

    #[error("training set contains only {0} labels")]
    SingleClass(&'static str),

    #[error("logistic regression did not converge within {0} iterations")]
    NotConverged(usize),

    #[error("similarity matrix is {similarity}x{similarity} but citation matrix is {citation}x{citation}")]
    ShapeMismatch { similarity: usize, citation: usize },
}

/// Impact ranking errors
#[derive(Debug, Error)]
pub enum RankingError {
    #[error("no weighted ranking metric is available (unavailable: {0})")]
    NoMetrics(String),

    #[error("invalid fusion weights: {0}")]
    InvalidWeights(String),
}
