//! HITS hub and authority scores

use petgraph::graph::DiGraph;
use petgraph::visit::EdgeRef;

use super::NotConverged;

#[derive(Debug, Clone)]
pub struct HitsConfig {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for HitsConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-8,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HitsScores {
    /// How well a paper's references point at authorities
    pub hubs: Vec<f64>,
    /// How well a paper is cited by hubs
    pub authorities: Vec<f64>,
}

/// Mutual-reinforcement iteration: authority = Aᵀ·hub, hub = A·authority.
///
/// Both vectors are max-normalized every round and sum-normalized at the
/// end. A graph without citations has all-zero scores.
pub fn hits<N, E>(graph: &DiGraph<N, E>, config: &HitsConfig) -> Result<HitsScores, NotConverged> {
    let n = graph.node_count();
    if n == 0 || graph.edge_count() == 0 {
        return Ok(HitsScores {
            hubs: vec![0.0; n],
            authorities: vec![0.0; n],
        });
    }

    let mut hubs = vec![1.0 / n as f64; n];
    let mut authorities = vec![0.0; n];

    for _ in 0..config.max_iterations {
        authorities.iter_mut().for_each(|a| *a = 0.0);
        for edge in graph.edge_references() {
            authorities[edge.target().index()] += hubs[edge.source().index()];
        }

        let mut next = vec![0.0; n];
        for edge in graph.edge_references() {
            next[edge.source().index()] += authorities[edge.target().index()];
        }

        scale_to_max(&mut next);
        scale_to_max(&mut authorities);

        let diff: f64 = next.iter().zip(&hubs).map(|(a, b)| (a - b).abs()).sum();
        hubs = next;

        if diff < config.tolerance {
            scale_to_sum(&mut hubs);
            scale_to_sum(&mut authorities);
            return Ok(HitsScores { hubs, authorities });
        }
    }

    Err(NotConverged {
        iterations: config.max_iterations,
    })
}

fn scale_to_max(values: &mut [f64]) {
    let max = values.iter().cloned().fold(0.0f64, f64::max);
    if max > 0.0 {
        values.iter_mut().for_each(|v| *v /= max);
    }
}

fn scale_to_sum(values: &mut [f64]) {
    let sum: f64 = values.iter().sum();
    if sum > 0.0 {
        values.iter_mut().for_each(|v| *v /= sum);
    }
}
