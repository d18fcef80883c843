use anyhow::{Context, Result};
use log::{debug, info};
use std::time::{Duration, Instant};

use crate::cli::{CorpusArgs, EmbedderArgs, PredictorArgs, RankingArgs};
use crate::common::{format_elapsed, read_jsonl, CitationEdge, Paper};
use crate::embedding::EmbedderConfig;
use crate::graph::{GraphStore, LoadOptions, LoadReport};
use crate::predictor::{PredictorConfig, Sampling};
use crate::ranking::{FusionWeights, RankerConfig};

/// Size the global rayon pool once per process
pub fn configure_threads(threads: Option<usize>) {
    let threads = threads.unwrap_or_else(num_cpus::get).max(1);
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build_global() {
        Ok(()) => info!("Using {} worker threads", threads),
        Err(e) => debug!("Thread pool already configured: {}", e),
    }
}

/// Read papers and citations and build the citation graph
pub fn load_corpus(args: &CorpusArgs) -> Result<(GraphStore, LoadReport)> {
    let start = Instant::now();
    info!("Papers: {}", args.papers);
    info!("Citations: {}", args.citations);

    let (papers, _) = read_jsonl::<Paper, _>(&args.papers).context("Failed to read papers")?;
    let (edges, _) =
        read_jsonl::<CitationEdge, _>(&args.citations).context("Failed to read citations")?;

    let options = LoadOptions {
        strict: args.strict,
    };
    let loaded = GraphStore::load(papers, &edges, &options).context("Citation graph integrity check failed")?;

    info!("Corpus loaded in {}", format_elapsed(start.elapsed()));
    Ok(loaded)
}

pub fn ranker_config(args: &RankingArgs) -> Result<RankerConfig> {
    let weights = match &args.weights {
        Some(weights) => FusionWeights::parse(weights).context("Invalid --weights")?,
        None => FusionWeights::default(),
    };

    let mut config = RankerConfig {
        weights,
        excluded_prefixes: args.exclude_prefixes.clone(),
        ..Default::default()
    }
    .with_max_iterations(args.max_iterations);
    config.pagerank.damping = args.damping;

    if !(0.0..1.0).contains(&config.pagerank.damping) {
        anyhow::bail!("--damping must be in [0, 1), got {}", args.damping);
    }
    Ok(config)
}

pub fn predictor_config(args: &PredictorArgs) -> Result<PredictorConfig> {
    if !(0.0..1.0).contains(&args.test_fraction) {
        anyhow::bail!("--test-fraction must be in [0, 1), got {}", args.test_fraction);
    }
    if args.regularization <= 0.0 {
        anyhow::bail!("--regularization must be positive, got {}", args.regularization);
    }

    let sampling = match args.negative_ratio {
        Some(ratio) if ratio > 0.0 => Sampling::NegativeSampled { ratio },
        Some(ratio) => anyhow::bail!("--negative-ratio must be positive, got {}", ratio),
        None => Sampling::Exhaustive,
    };

    Ok(PredictorConfig {
        c: args.regularization,
        test_fraction: args.test_fraction,
        seed: args.seed,
        sampling,
        ..Default::default()
    })
}

pub fn embedder_config(args: &EmbedderArgs) -> EmbedderConfig {
    EmbedderConfig {
        kind: args.embedder,
        dimension: args.embedding_dim,
        max_tokens: args.max_tokens,
        url: args.embedding_url.clone(),
        model: args.embedding_model.clone(),
        api_key: args.embedding_api_key.clone(),
        concurrency: args.concurrency,
        timeout: Duration::from_secs(args.timeout),
        batch_size: args.batch_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranking_args() -> RankingArgs {
        RankingArgs {
            weights: None,
            damping: 0.85,
            max_iterations: 100,
            exclude_prefixes: vec!["_:".to_string()],
        }
    }

    fn predictor_args() -> PredictorArgs {
        PredictorArgs {
            test_fraction: 0.2,
            negative_ratio: None,
            regularization: 1.0,
            seed: 42,
        }
    }

    #[test]
    fn test_ranker_config_defaults() {
        let config = ranker_config(&ranking_args()).unwrap();
        assert_eq!(config.weights, FusionWeights::default());
        assert_eq!(config.pagerank.damping, 0.85);
        assert_eq!(config.eigenvector.max_iterations, 100);
    }

    #[test]
    fn test_ranker_config_rejects_bad_damping() {
        let args = RankingArgs {
            damping: 1.5,
            ..ranking_args()
        };
        assert!(ranker_config(&args).is_err());
    }

    #[test]
    fn test_predictor_config_sampling() {
        let config = predictor_config(&predictor_args()).unwrap();
        assert_eq!(config.sampling, Sampling::Exhaustive);

        let args = PredictorArgs {
            negative_ratio: Some(5.0),
            ..predictor_args()
        };
        let config = predictor_config(&args).unwrap();
        assert_eq!(config.sampling, Sampling::NegativeSampled { ratio: 5.0 });

        let args = PredictorArgs {
            test_fraction: 1.0,
            ..predictor_args()
        };
        assert!(predictor_config(&args).is_err());
    }
}
