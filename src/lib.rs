//! Citation knowledge graph over a static corpus snapshot, with two
//! analyses on top: citation recommendation for new manuscripts and
//! composite impact ranking of existing papers.

pub mod cli;
pub mod commands;
pub mod common;
pub mod embedding;
pub mod error;
pub mod graph;
pub mod predictor;
pub mod ranking;
pub mod recommend;
pub mod similarity;
