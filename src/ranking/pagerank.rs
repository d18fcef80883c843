//! PageRank over the directed citation graph

use petgraph::graph::DiGraph;
use petgraph::visit::EdgeRef;

use super::NotConverged;

/// PageRank configuration
#[derive(Debug, Clone)]
pub struct PageRankConfig {
    /// Damping factor (typically 0.85)
    pub damping: f64,

    /// Maximum iterations
    pub max_iterations: usize,

    /// Convergence threshold, scaled by node count
    pub tolerance: f64,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}

/// Stationary distribution of a damped random walk along citations.
///
/// Rank held by papers with no outgoing citations is spread uniformly
/// over all papers, so the scores always sum to 1.
pub fn pagerank<N, E>(graph: &DiGraph<N, E>, config: &PageRankConfig) -> Result<Vec<f64>, NotConverged> {
    let n = graph.node_count();
    if n == 0 {
        return Ok(Vec::new());
    }

    let n_f64 = n as f64;
    let damping = config.damping;

    let out_degree: Vec<usize> = graph
        .node_indices()
        .map(|node| graph.edges(node).count())
        .collect();

    let mut scores = vec![1.0 / n_f64; n];

    for _ in 0..config.max_iterations {
        let dangling: f64 = scores
            .iter()
            .zip(&out_degree)
            .filter(|(_, &degree)| degree == 0)
            .map(|(score, _)| score)
            .sum();
        let base = (damping * dangling + (1.0 - damping)) / n_f64;

        let mut next = vec![base; n];
        for edge in graph.edge_references() {
            let source = edge.source().index();
            next[edge.target().index()] += damping * scores[source] / out_degree[source] as f64;
        }

        let diff: f64 = next.iter().zip(&scores).map(|(a, b)| (a - b).abs()).sum();
        scores = next;

        if diff < n_f64 * config.tolerance {
            return Ok(scores);
        }
    }

    Err(NotConverged {
        iterations: config.max_iterations,
    })
}
