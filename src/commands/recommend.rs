use anyhow::{Context, Result};
use log::info;
use serde::Serialize;
use std::time::Instant;

use super::corpus::{configure_threads, embedder_config, load_corpus, predictor_config};
use crate::cli::RecommendArgs;
use crate::common::{
    create_stage_spinner, format_elapsed, read_jsonl, setup_logging, JsonlWriter, NewPaper,
    RecommendStats,
};
use crate::embedding::{build_provider, EmbedderConfig};
use crate::graph::{GraphStore, LoadReport};
use crate::predictor::{CitationPredictor, PredictorConfig};
use crate::recommend::{Recommendation, Recommender, RecommenderOptions};
use crate::similarity::SimilarityIndex;

/// One output line: the query and its suggested citations
#[derive(Debug, Serialize)]
struct QueryRecommendations<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    query_id: Option<&'a str>,
    title: &'a str,
    recommendations: Vec<Recommendation>,
}

pub fn run_recommend(args: RecommendArgs) -> Result<RecommendStats> {
    let start_time = Instant::now();

    setup_logging(&args.corpus.log_level)?;
    configure_threads(args.corpus.threads);

    info!("Starting citation recommendation");
    info!("Queries: {}", args.queries);
    info!("Output: {}", args.output);

    let predictor = predictor_config(&args.predictor)?;
    let embedder = embedder_config(&args.embedder);
    let (store, report) = load_corpus(&args.corpus)?;

    let request = RecommendRequest {
        queries: &args.queries,
        output: &args.output,
        top_k: args.top_k,
        exclude_self: args.exclude_self,
    };
    let stats = recommend_corpus(&store, &report, &embedder, predictor, &request)?;

    info!("==================== FINAL SUMMARY ====================");
    info!("Total execution time: {}", format_elapsed(start_time.elapsed()));
    info!("Papers: {}", stats.papers);
    info!("Training pairs: {}", stats.training_pairs);
    match stats.roc_auc {
        Some(auc) => info!("Held-out ROC-AUC: {:.4}", auc),
        None => info!("Held-out ROC-AUC: n/a"),
    }
    info!("Queries: {} ({} skipped)", stats.queries_read, stats.queries_skipped);
    info!("Recommendations written: {}", stats.recommendations_written);
    info!("Output file: {}", args.output);
    info!("========================================================");

    Ok(stats)
}

pub(crate) struct RecommendRequest<'a> {
    pub queries: &'a str,
    pub output: &'a str,
    pub top_k: usize,
    pub exclude_self: bool,
}

/// Embed the corpus, train the predictor and answer every query
pub(crate) fn recommend_corpus(
    store: &GraphStore,
    report: &LoadReport,
    embedder: &EmbedderConfig,
    predictor: PredictorConfig,
    request: &RecommendRequest<'_>,
) -> Result<RecommendStats> {
    let (queries, query_stats) =
        read_jsonl::<NewPaper, _>(request.queries).context("Failed to read queries")?;

    let provider = build_provider(embedder).context("Failed to create embedding provider")?;

    let step = Instant::now();
    let index = SimilarityIndex::build_with_batch_size(store.papers(), &provider, embedder.batch_size)
        .context("Failed to embed corpus")?;
    info!("Similarity index ready in {}", format_elapsed(step.elapsed()));

    let spinner = create_stage_spinner("Training citation predictor");
    let trained = CitationPredictor::new(predictor)
        .train(index.similarity_matrix(), store.citation_matrix());
    spinner.finish_and_clear();
    let classifier = trained.context("Failed to train citation predictor")?;

    let recommender = Recommender::new(
        store,
        &index,
        &classifier,
        &provider,
        RecommenderOptions {
            exclude_self: request.exclude_self,
        },
    );

    let mut writer = JsonlWriter::create(request.output)?;
    let mut recommendations_written = 0;
    for query in &queries {
        let recommendations = recommender
            .recommend(query, request.top_k)
            .with_context(|| format!("Failed to embed query '{}'", query.title))?;
        recommendations_written += recommendations.len();
        writer.write(&QueryRecommendations {
            query_id: query.id.as_deref(),
            title: &query.title,
            recommendations,
        })?;
    }
    writer.finish()?;

    let (hits, misses) = provider.stats();
    info!("Embedding cache: {} hits, {} misses", hits, misses);

    Ok(RecommendStats {
        papers: store.len(),
        citations: report.edges_kept,
        training_pairs: classifier.pairs,
        roc_auc: classifier.evaluation.as_ref().and_then(|e| e.roc_auc),
        queries_read: query_stats.records_parsed,
        queries_skipped: query_stats.records_skipped,
        recommendations_written,
    })
}
