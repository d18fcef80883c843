use anyhow::Result;
use log::info;
use std::time::Instant;

use super::corpus::{configure_threads, embedder_config, load_corpus, predictor_config, ranker_config};
use super::rank::rank_corpus;
use super::recommend::{recommend_corpus, RecommendRequest};
use crate::cli::PipelineArgs;
use crate::common::{format_elapsed, setup_logging, RankStats, RecommendStats};

/// Run the full pipeline: load -> rank -> recommend
pub fn run_pipeline(args: PipelineArgs) -> Result<(RankStats, RecommendStats)> {
    let start_time = Instant::now();

    setup_logging(&args.corpus.log_level)?;
    configure_threads(args.corpus.threads);

    info!("Starting citation graph pipeline");
    info!("Queries: {}", args.queries);
    info!("Rank output: {}", args.rank_output);
    info!("Recommend output: {}", args.recommend_output);

    // Validate every option before the expensive steps start
    let ranker = ranker_config(&args.ranking)?;
    let predictor = predictor_config(&args.predictor)?;
    let embedder = embedder_config(&args.embedder);

    info!("");
    info!("=== STEP 1/3: Loading citation graph ===");
    info!("");

    let (store, report) = load_corpus(&args.corpus)?;

    info!("");
    info!("=== STEP 2/3: Ranking papers by impact ===");
    info!("");

    let step = Instant::now();
    let rank_stats = rank_corpus(&store, &report, ranker, &args.rank_output)?;
    info!("Rank complete in {}", format_elapsed(step.elapsed()));

    info!("");
    info!("=== STEP 3/3: Recommending citations ===");
    info!("");

    let step = Instant::now();
    let request = RecommendRequest {
        queries: &args.queries,
        output: &args.recommend_output,
        top_k: args.top_k,
        exclude_self: args.exclude_self,
    };
    let recommend_stats = recommend_corpus(&store, &report, &embedder, predictor, &request)?;
    info!("Recommend complete in {}", format_elapsed(step.elapsed()));

    info!("");
    info!("==================== PIPELINE COMPLETE ====================");
    info!("Total execution time: {}", format_elapsed(start_time.elapsed()));
    info!("");
    info!("Graph:");
    info!("  Papers: {}", rank_stats.papers);
    info!("  Citations kept: {}", rank_stats.citations);
    if rank_stats.dropped_edges > 0 {
        info!("  Citations dropped (unknown paper): {}", rank_stats.dropped_edges);
    }
    if report.duplicate_edges > 0 {
        info!("  Duplicate citations collapsed: {}", report.duplicate_edges);
    }
    info!("");
    info!("Rank step:");
    info!("  Metrics used: {}", rank_stats.metrics_available.join(", "));
    info!("  Records written: {}", rank_stats.records_written);
    info!("");
    info!("Recommend step:");
    info!("  Training pairs: {}", recommend_stats.training_pairs);
    match recommend_stats.roc_auc {
        Some(auc) => info!("  Held-out ROC-AUC: {:.4}", auc),
        None => info!("  Held-out ROC-AUC: n/a"),
    }
    info!("  Queries: {}", recommend_stats.queries_read);
    if recommend_stats.queries_skipped > 0 {
        info!("  Malformed queries skipped: {}", recommend_stats.queries_skipped);
    }
    info!("  Recommendations written: {}", recommend_stats.recommendations_written);
    info!("");
    info!("Output: {}, {}", args.rank_output, args.recommend_output);
    info!("===========================================================");

    Ok((rank_stats, recommend_stats))
}
