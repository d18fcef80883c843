//! Composite impact ranking.
//!
//! Three independent centralities over the citation graph (PageRank,
//! HITS hub, eigenvector) are each min-max normalized and averaged with
//! configurable weights. A metric that fails to converge is left out and
//! the remaining weights are renormalized.

mod eigenvector;
mod fusion;
mod hits;
mod pagerank;

pub use eigenvector::{eigenvector_centrality, EigenvectorConfig};
pub use fusion::{fuse, min_max_normalize, FusionWeights, Metric};
pub use hits::{hits, HitsConfig, HitsScores};
pub use pagerank::{pagerank, PageRankConfig};

use log::{info, warn};
use serde::Serialize;
use std::time::Instant;
use thiserror::Error;

use crate::common::format_elapsed;
use crate::error::RankingError;
use crate::graph::GraphStore;

/// An iterative centrality ran out of iterations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("did not converge within {iterations} iterations")]
pub struct NotConverged {
    pub iterations: usize,
}

/// Ranking settings
#[derive(Debug, Clone)]
pub struct RankerConfig {
    pub pagerank: PageRankConfig,
    pub hits: HitsConfig,
    pub eigenvector: EigenvectorConfig,
    /// Node ids with any of these prefixes are not papers and are left out
    /// of eigenvector centrality
    pub excluded_prefixes: Vec<String>,
    pub weights: FusionWeights,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            pagerank: PageRankConfig::default(),
            hits: HitsConfig::default(),
            eigenvector: EigenvectorConfig::default(),
            excluded_prefixes: vec!["_:".to_string()],
            weights: FusionWeights::default(),
        }
    }
}

impl RankerConfig {
    /// Apply one iteration budget to all three algorithms
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.pagerank.max_iterations = max_iterations;
        self.hits.max_iterations = max_iterations;
        self.eigenvector.max_iterations = max_iterations;
        self
    }
}

/// Final score plus the raw metric values behind it
#[derive(Debug, Clone, Serialize)]
pub struct RankedPaper {
    pub paper_id: String,
    pub score: f64,
    pub pagerank: Option<f64>,
    pub hub: Option<f64>,
    pub authority: Option<f64>,
    pub eigenvector: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ImpactRanking {
    /// Sorted by descending score; ties keep corpus order
    pub papers: Vec<RankedPaper>,
    pub available: Vec<Metric>,
    pub unavailable: Vec<Metric>,
}

pub struct ImpactRanker {
    config: RankerConfig,
}

impl ImpactRanker {
    pub fn new(config: RankerConfig) -> Self {
        Self { config }
    }

    pub fn rank(&self, store: &GraphStore) -> Result<ImpactRanking, RankingError> {
        self.config.weights.validate()?;

        let start = Instant::now();
        let graph = store.adjacency();
        let n = store.len();

        let mut raw: Vec<(Metric, Vec<Option<f64>>)> = Vec::with_capacity(4);
        let mut unavailable = Vec::new();

        match pagerank(graph, &self.config.pagerank) {
            Ok(scores) => raw.push((Metric::PageRank, scores.into_iter().map(Some).collect())),
            Err(e) => {
                warn!("PageRank unavailable: {}", e);
                unavailable.push(Metric::PageRank);
            }
        }

        match hits(graph, &self.config.hits) {
            Ok(scores) => {
                raw.push((Metric::Hub, scores.hubs.into_iter().map(Some).collect()));
                raw.push((Metric::Authority, scores.authorities.into_iter().map(Some).collect()));
            }
            Err(e) => {
                warn!("HITS unavailable: {}", e);
                unavailable.push(Metric::Hub);
                unavailable.push(Metric::Authority);
            }
        }

        let include: Vec<bool> = store
            .papers()
            .iter()
            .map(|p| !self.config.excluded_prefixes.iter().any(|prefix| p.id.starts_with(prefix.as_str())))
            .collect();
        let excluded = include.iter().filter(|&&keep| !keep).count();
        if excluded > 0 {
            info!("Excluding {} non-paper nodes from eigenvector centrality", excluded);
        }
        match eigenvector_centrality(graph, &include, &self.config.eigenvector) {
            Ok(scores) => raw.push((Metric::Eigenvector, scores)),
            Err(e) => {
                warn!("Eigenvector centrality unavailable: {}", e);
                unavailable.push(Metric::Eigenvector);
            }
        }

        let metrics: Vec<(Metric, &[Option<f64>])> =
            raw.iter().map(|(m, v)| (*m, v.as_slice())).collect();
        let scores = fuse(n, &metrics, &self.config.weights)?;

        let lookup = |metric: Metric, i: usize| -> Option<f64> {
            raw.iter().find(|(m, _)| *m == metric).and_then(|(_, v)| v[i])
        };

        let mut papers: Vec<RankedPaper> = store
            .papers()
            .iter()
            .enumerate()
            .map(|(i, paper)| RankedPaper {
                paper_id: paper.id.clone(),
                score: scores[i],
                pagerank: lookup(Metric::PageRank, i),
                hub: lookup(Metric::Hub, i),
                authority: lookup(Metric::Authority, i),
                eigenvector: lookup(Metric::Eigenvector, i),
            })
            .collect();

        // Stable sort keeps insertion order among equal scores
        papers.sort_by(|a, b| b.score.total_cmp(&a.score));

        let available: Vec<Metric> = raw.iter().map(|(m, _)| *m).collect();
        info!(
            "Ranked {} papers using [{}] in {}",
            n,
            available.iter().map(Metric::as_str).collect::<Vec<_>>().join(", "),
            format_elapsed(start.elapsed())
        );

        Ok(ImpactRanking {
            papers,
            available,
            unavailable,
        })
    }
}
