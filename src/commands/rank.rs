use anyhow::{Context, Result};
use log::info;
use std::time::Instant;

use super::corpus::{configure_threads, load_corpus, ranker_config};
use crate::cli::RankArgs;
use crate::common::{create_stage_spinner, format_elapsed, setup_logging, JsonlWriter, RankStats};
use crate::graph::{GraphStore, LoadReport};
use crate::ranking::{ImpactRanker, RankerConfig};

pub fn run_rank(args: RankArgs) -> Result<RankStats> {
    let start_time = Instant::now();

    setup_logging(&args.corpus.log_level)?;
    configure_threads(args.corpus.threads);

    info!("Starting impact ranking");
    info!("Output: {}", args.output);

    let config = ranker_config(&args.ranking)?;
    let (store, report) = load_corpus(&args.corpus)?;

    let stats = rank_corpus(&store, &report, config, &args.output)?;

    info!("==================== FINAL SUMMARY ====================");
    info!("Total execution time: {}", format_elapsed(start_time.elapsed()));
    info!("Papers: {}", stats.papers);
    info!("Citations: {} ({} dropped)", stats.citations, stats.dropped_edges);
    info!("Metrics used: {}", stats.metrics_available.join(", "));
    info!("Output file: {}", args.output);
    info!("========================================================");

    Ok(stats)
}

/// Rank a loaded corpus and write one JSONL record per paper, best first
pub(crate) fn rank_corpus(
    store: &GraphStore,
    report: &LoadReport,
    config: RankerConfig,
    output: &str,
) -> Result<RankStats> {
    let spinner = create_stage_spinner("Computing centrality scores");
    let ranked = ImpactRanker::new(config).rank(store);
    spinner.finish_and_clear();
    let ranking = ranked.context("Impact ranking failed")?;

    let mut writer = JsonlWriter::create(output)?;
    for paper in &ranking.papers {
        writer.write(paper)?;
    }
    let records_written = writer.finish()?;

    if let Some(top) = ranking.papers.first() {
        info!("Top paper: {} (score {:.4})", top.paper_id, top.score);
    }

    Ok(RankStats {
        papers: store.len(),
        citations: store.edge_count(),
        dropped_edges: report.dropped_edges,
        metrics_available: ranking.available.iter().map(|m| m.to_string()).collect(),
        records_written,
    })
}
