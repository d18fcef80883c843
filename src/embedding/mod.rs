//! Embedding boundary: text in, fixed-length vector out.
//!
//! Providers are created once by the command layer and passed by reference
//! to everything that needs vectors. Wrap a provider in [`CachedEmbedder`]
//! so each distinct text is embedded at most once per run.

mod cache;
mod hashing;
mod http;

pub use cache::CachedEmbedder;
pub use hashing::HashingEmbedder;
pub use http::HttpEmbedder;

use log::{debug, info};
use std::time::{Duration, Instant};

use crate::common::{create_embedding_progress_bar, format_elapsed};
use crate::error::EmbeddingError;

/// Texts sent to a provider per call when embedding a whole corpus
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Default whitespace-token budget per input text
pub const DEFAULT_MAX_TOKENS: usize = 512;

/// A deterministic text embedding function
pub trait EmbeddingProvider: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Embed a batch of texts; output order matches input order
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed_batch(&[text.to_string()])?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::Response("provider returned no vectors".to_string()))
    }
}

impl<P: EmbeddingProvider + ?Sized> EmbeddingProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        (**self).embed_batch(texts)
    }
}

/// Which provider the command layer should construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EmbedderKind {
    /// Local feature-hashing embedder (no network)
    Hashing,
    /// OpenAI-compatible `/embeddings` endpoint
    Http,
}

/// Provider construction settings
#[derive(Debug, Clone)]
pub struct EmbedderConfig {
    pub kind: EmbedderKind,
    pub dimension: usize,
    pub max_tokens: usize,
    pub url: Option<String>,
    pub model: String,
    pub api_key: Option<String>,
    pub concurrency: usize,
    pub timeout: Duration,
    pub batch_size: usize,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            kind: EmbedderKind::Hashing,
            dimension: 384,
            max_tokens: DEFAULT_MAX_TOKENS,
            url: None,
            model: "all-MiniLM-L6-v2".to_string(),
            api_key: None,
            concurrency: 8,
            timeout: Duration::from_secs(30),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Build the configured provider, wrapped in a per-run cache
pub fn build_provider(
    config: &EmbedderConfig,
) -> Result<CachedEmbedder<Box<dyn EmbeddingProvider>>, EmbeddingError> {
    let inner: Box<dyn EmbeddingProvider> = match config.kind {
        EmbedderKind::Hashing => {
            let embedder = HashingEmbedder::new(config.dimension, config.max_tokens);
            debug!("Hashing embedder with {} buckets", embedder.dimension());
            Box::new(embedder)
        }
        EmbedderKind::Http => {
            let url = config.url.clone().ok_or_else(|| {
                EmbeddingError::Request("--embedding-url is required for the http embedder".to_string())
            })?;
            Box::new(HttpEmbedder::new(
                url,
                config.model.clone(),
                config.api_key.clone(),
                config.max_tokens,
                config.concurrency,
                config.timeout,
            )?)
        }
    };
    info!("Embedding provider: {}", inner.name());
    Ok(CachedEmbedder::new(inner))
}

/// Keep at most `max_tokens` whitespace-separated tokens.
///
/// Oversized inputs are cut rather than rejected so one long abstract
/// never fails the run.
pub fn truncate_tokens(text: &str, max_tokens: usize) -> String {
    text.split_whitespace()
        .take(max_tokens)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Embed every text in `batch_size` chunks with a progress bar
pub fn embed_all<P: EmbeddingProvider + ?Sized>(
    provider: &P,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let start = Instant::now();
    let pb = create_embedding_progress_bar(texts.len() as u64, provider.name());

    let mut vectors = Vec::with_capacity(texts.len());
    for chunk in texts.chunks(batch_size.max(1)) {
        let batch = provider.embed_batch(chunk)?;
        if batch.len() != chunk.len() {
            pb.abandon();
            return Err(EmbeddingError::Response(format!(
                "expected {} vectors, got {}",
                chunk.len(),
                batch.len()
            )));
        }
        vectors.extend(batch);
        pb.inc(chunk.len() as u64);
    }
    pb.finish_and_clear();

    if let Some(first) = vectors.first() {
        let expected = first.len();
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
            return Err(EmbeddingError::Dimension {
                expected,
                actual: bad.len(),
            });
        }
    }

    info!(
        "Embedded {} texts with {} in {}",
        texts.len(),
        provider.name(),
        format_elapsed(start.elapsed())
    );
    Ok(vectors)
}
