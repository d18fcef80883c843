//! In-memory citation graph over a static corpus snapshot.
//!
//! Papers keep their insertion order; that order is the canonical
//! index for every matrix row/column and every graph node downstream.

mod matrix;

pub use matrix::CitationMatrix;

use log::{debug, info, warn};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use crate::common::{CitationEdge, Paper};
use crate::error::GraphError;

/// Only the first few dropped edges are logged individually
const MAX_LOGGED_DROPS: usize = 5;

/// Options controlling graph construction
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Fail instead of dropping edges whose endpoints are not loaded papers
    pub strict: bool,
}

/// Counters from a graph load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub papers: usize,
    pub edges_read: usize,
    pub edges_kept: usize,
    pub dropped_edges: usize,
    pub duplicate_edges: usize,
}

/// Papers plus derived citation structures
#[derive(Debug, Clone)]
pub struct GraphStore {
    papers: Vec<Paper>,
    index: HashMap<String, usize>,
    matrix: CitationMatrix,
    graph: DiGraph<usize, ()>,
}

impl GraphStore {
    /// Build the store from papers and citation edges.
    ///
    /// The id lookup is complete before the first edge is visited, so the
    /// relative order of papers and edges does not matter. An edge whose
    /// endpoint is never loaded is dropped (or rejected when `strict`).
    pub fn load(
        papers: Vec<Paper>,
        edges: &[CitationEdge],
        options: &LoadOptions,
    ) -> Result<(Self, LoadReport), GraphError> {
        let mut index = HashMap::with_capacity(papers.len());
        for (i, paper) in papers.iter().enumerate() {
            if index.insert(paper.id.clone(), i).is_some() {
                return Err(GraphError::Integrity(format!(
                    "duplicate paper id '{}'",
                    paper.id
                )));
            }
        }

        let mut pairs = Vec::with_capacity(edges.len());
        let mut dropped = 0;
        for edge in edges {
            match (index.get(&edge.citing), index.get(&edge.cited)) {
                (Some(&i), Some(&j)) => pairs.push((i, j)),
                _ => {
                    if options.strict {
                        return Err(GraphError::Integrity(format!(
                            "citation {} -> {} references an unknown paper",
                            edge.citing, edge.cited
                        )));
                    }
                    if dropped < MAX_LOGGED_DROPS {
                        debug!(
                            "Dropping citation {} -> {}: endpoint not in corpus",
                            edge.citing, edge.cited
                        );
                    }
                    dropped += 1;
                }
            }
        }

        let (matrix, duplicates) = CitationMatrix::from_pairs(papers.len(), &pairs);

        let mut graph = DiGraph::with_capacity(papers.len(), matrix.nnz());
        for i in 0..papers.len() {
            graph.add_node(i);
        }
        for (i, j) in matrix.iter() {
            graph.add_edge(NodeIndex::new(i), NodeIndex::new(j), ());
        }

        let report = LoadReport {
            papers: papers.len(),
            edges_read: edges.len(),
            edges_kept: matrix.nnz(),
            dropped_edges: dropped,
            duplicate_edges: duplicates,
        };

        if dropped > 0 {
            warn!(
                "Dropped {} of {} citations referencing papers outside the corpus",
                dropped,
                edges.len()
            );
        }
        info!(
            "Loaded citation graph: {} papers, {} citations ({} duplicates collapsed)",
            report.papers, report.edges_kept, report.duplicate_edges
        );
        let citing_nothing = (0..matrix.size()).filter(|&i| matrix.out_degree(i) == 0).count();
        debug!("{} papers cite nothing inside the corpus", citing_nothing);

        Ok((
            Self {
                papers,
                index,
                matrix,
                graph,
            },
            report,
        ))
    }

    /// Papers in insertion order
    pub fn papers(&self) -> &[Paper] {
        &self.papers
    }

    pub fn paper(&self, i: usize) -> &Paper {
        &self.papers[i]
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn citation_matrix(&self) -> &CitationMatrix {
        &self.matrix
    }

    /// Directed citation graph; node `i` carries paper index `i`
    pub fn adjacency(&self) -> &DiGraph<usize, ()> {
        &self.graph
    }

    pub fn edge_count(&self) -> usize {
        self.matrix.nnz()
    }
}
