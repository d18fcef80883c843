//! Eigenvector centrality on the undirected simplification of the graph

use petgraph::graph::DiGraph;
use petgraph::visit::EdgeRef;
use std::collections::BTreeSet;

use super::NotConverged;

#[derive(Debug, Clone)]
pub struct EigenvectorConfig {
    pub max_iterations: usize,
    /// Convergence threshold, scaled by node count
    pub tolerance: f64,
}

impl Default for EigenvectorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}

/// Dominant eigenvector of the undirected adjacency matrix, restricted to
/// nodes where `include[node]` is true.
///
/// Citation direction is dropped and reciprocal citations merge into one
/// edge. Power iteration runs on (A + I), which has the same dominant
/// eigenvector but cannot oscillate on bipartite graphs. Excluded nodes get
/// `None`; included nodes are L2-normalized.
pub fn eigenvector_centrality<N, E>(
    graph: &DiGraph<N, E>,
    include: &[bool],
    config: &EigenvectorConfig,
) -> Result<Vec<Option<f64>>, NotConverged> {
    let n = graph.node_count();
    debug_assert_eq!(include.len(), n);

    let mut neighbors: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
    for edge in graph.edge_references() {
        let (a, b) = (edge.source().index(), edge.target().index());
        if include[a] && include[b] {
            neighbors[a].insert(b);
            neighbors[b].insert(a);
        }
    }

    let domain: Vec<usize> = (0..n).filter(|&i| include[i]).collect();
    if domain.is_empty() {
        return Ok(vec![None; n]);
    }
    let size = domain.len() as f64;

    let mut x = vec![0.0; n];
    for &i in &domain {
        x[i] = 1.0 / size;
    }

    for _ in 0..config.max_iterations {
        let last = x.clone();
        for &i in &domain {
            for &j in &neighbors[i] {
                x[j] += last[i];
            }
        }

        let norm = domain.iter().map(|&i| x[i] * x[i]).sum::<f64>().sqrt();
        let norm = if norm > 0.0 { norm } else { 1.0 };
        for &i in &domain {
            x[i] /= norm;
        }

        let diff: f64 = domain.iter().map(|&i| (x[i] - last[i]).abs()).sum();
        if diff < size * config.tolerance {
            return Ok((0..n).map(|i| include[i].then_some(x[i])).collect());
        }
    }

    Err(NotConverged {
        iterations: config.max_iterations,
    })
}
