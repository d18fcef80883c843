use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

use citegraph::common::{CitationEdge, NewPaper, Paper};
use citegraph::embedding::{CachedEmbedder, EmbeddingProvider, HashingEmbedder};
use citegraph::graph::{GraphStore, LoadOptions};
use citegraph::predictor::{CitationPredictor, PredictorConfig};
use citegraph::ranking::{ImpactRanker, RankerConfig};
use citegraph::recommend::{Recommender, RecommenderOptions};
use citegraph::similarity::SimilarityIndex;

const PAPERS: &[(&str, &str)] = &[
    ("2101.00001", "pagerank random walk ranking of citation networks with damping"),
    ("2101.00002", "random walk ranking of citation networks and scholarly impact"),
    ("2101.00003", "hub and authority scores for citation networks ranking"),
    ("2101.00004", "sentence embeddings capture semantic similarity of scientific abstracts"),
    ("2101.00005", "transformer sentence embeddings for semantic similarity search"),
    ("2101.00006", "protein folding simulated with molecular dynamics"),
    ("2101.00007", "molecular dynamics of protein folding pathways"),
    ("2101.00008", "citation recommendation using semantic similarity of abstracts"),
];

const CITATIONS: &[(&str, &str)] = &[
    ("2101.00002", "2101.00001"),
    ("2101.00003", "2101.00001"),
    ("2101.00003", "2101.00002"),
    ("2101.00005", "2101.00004"),
    ("2101.00007", "2101.00006"),
    ("2101.00008", "2101.00004"),
    ("2101.00008", "2101.00005"),
    ("2101.00008", "2101.00001"),
    ("2101.00001", "2101.00002"),
    ("2101.00004", "2101.00005"),
    ("2101.00006", "2101.00007"),
];

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_citegraph"))
}

fn write_lines(path: &Path, lines: &[String]) {
    let mut file = File::create(path).unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
}

fn corpus_papers() -> Vec<Paper> {
    PAPERS
        .iter()
        .map(|(id, text)| Paper::new(id, &format!("Title {}", id), text))
        .collect()
}

fn corpus_edges() -> Vec<CitationEdge> {
    CITATIONS.iter().map(|(a, b)| CitationEdge::new(a, b)).collect()
}

/// Write papers.jsonl and citations.jsonl; returns their paths
fn create_corpus(dir: &Path) -> (PathBuf, PathBuf) {
    let papers = dir.join("papers.jsonl");
    let citations = dir.join("citations.jsonl");

    let paper_lines: Vec<String> = corpus_papers()
        .iter()
        .map(|p| serde_json::to_string(p).unwrap())
        .collect();
    write_lines(&papers, &paper_lines);

    let mut edge_lines: Vec<String> = corpus_edges()
        .iter()
        .map(|e| serde_json::to_string(e).unwrap())
        .collect();
    // Outside the corpus: dropped unless --strict
    edge_lines.push(r#"{"citing": "2101.00008", "cited": "9999.99999"}"#.to_string());
    write_lines(&citations, &edge_lines);

    (papers, citations)
}

fn read_jsonl(path: &Path) -> Vec<serde_json::Value> {
    BufReader::new(File::open(path).unwrap())
        .lines()
        .map(|line| serde_json::from_str(&line.unwrap()).unwrap())
        .collect()
}

#[test]
fn test_pipeline_help() {
    let status = bin()
        .args(["pipeline", "--help"])
        .status()
        .expect("Failed to run pipeline --help");

    assert!(status.success(), "Pipeline --help should succeed");
}

#[test]
fn test_rank_writes_sorted_scores() {
    let dir = tempdir().unwrap();
    let (papers, citations) = create_corpus(dir.path());
    let output = dir.path().join("ranking.jsonl");

    let status = bin()
        .args(["rank", "--papers", papers.to_str().unwrap()])
        .args(["--citations", citations.to_str().unwrap()])
        .args(["--output", output.to_str().unwrap()])
        .args(["--log-level", "WARN"])
        .status()
        .expect("Failed to run rank");

    assert!(status.success(), "Rank should succeed");

    let records = read_jsonl(&output);
    assert_eq!(records.len(), PAPERS.len());

    let scores: Vec<f64> = records.iter().map(|r| r["score"].as_f64().unwrap()).collect();
    assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
    assert!(scores.windows(2).all(|w| w[0] >= w[1]), "Scores should be non-increasing");
    assert!(records.iter().all(|r| r.get("paper_id").is_some() && r.get("pagerank").is_some()));
}

#[test]
fn test_rank_strict_fails_on_unknown_paper() {
    let dir = tempdir().unwrap();
    let (papers, citations) = create_corpus(dir.path());
    let output = dir.path().join("ranking.jsonl");

    let status = bin()
        .args(["rank", "--strict", "--papers", papers.to_str().unwrap()])
        .args(["--citations", citations.to_str().unwrap()])
        .args(["--output", output.to_str().unwrap()])
        .args(["--log-level", "ERROR"])
        .status()
        .expect("Failed to run rank");

    assert!(!status.success(), "Strict rank should fail on a dangling citation");
}

#[test]
fn test_duplicate_paper_id_fails() {
    let dir = tempdir().unwrap();
    let papers = dir.path().join("papers.jsonl");
    let citations = dir.path().join("citations.jsonl");
    write_lines(
        &papers,
        &[
            r#"{"id": "a", "title": "A", "abstract": "first"}"#.to_string(),
            r#"{"id": "a", "title": "A again", "abstract": "second"}"#.to_string(),
        ],
    );
    write_lines(&citations, &[]);

    let status = bin()
        .args(["rank", "--papers", papers.to_str().unwrap()])
        .args(["--citations", citations.to_str().unwrap()])
        .args(["--output", dir.path().join("out.jsonl").to_str().unwrap()])
        .args(["--log-level", "ERROR"])
        .status()
        .expect("Failed to run rank");

    assert!(!status.success());
}

#[test]
fn test_recommend_identical_abstract_first() {
    let dir = tempdir().unwrap();
    let (papers, citations) = create_corpus(dir.path());
    let queries = dir.path().join("queries.jsonl");
    let output = dir.path().join("recommendations.jsonl");

    write_lines(
        &queries,
        &[
            format!(
                r#"{{"title": "Folding", "abstract": "{}", "discipline": "q-bio"}}"#,
                PAPERS[5].1
            ),
            "{not valid json".to_string(),
            r#"{"title": "Ranking", "abstract": "ranking citation networks by random walks"}"#.to_string(),
        ],
    );

    let status = bin()
        .args(["recommend", "--papers", papers.to_str().unwrap()])
        .args(["--citations", citations.to_str().unwrap()])
        .args(["--queries", queries.to_str().unwrap()])
        .args(["--output", output.to_str().unwrap()])
        .args(["--top-k", "3", "--log-level", "WARN"])
        .status()
        .expect("Failed to run recommend");

    assert!(status.success(), "Malformed query lines should be skipped, not fatal");

    let records = read_jsonl(&output);
    assert_eq!(records.len(), 2);

    let first = records[0]["recommendations"].as_array().unwrap();
    assert_eq!(first.len(), 3);
    assert_eq!(first[0]["paper_id"], PAPERS[5].0);
    assert_eq!(first[0]["abstract"], PAPERS[5].1);

    let probabilities: Vec<f64> = first.iter().map(|r| r["probability"].as_f64().unwrap()).collect();
    assert!(probabilities.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn test_recommend_fails_when_embedding_service_unreachable() {
    let dir = tempdir().unwrap();
    let (papers, citations) = create_corpus(dir.path());
    let queries = dir.path().join("queries.jsonl");
    let output = dir.path().join("recommendations.jsonl");
    write_lines(&queries, &[r#"{"title": "Q", "abstract": "citation ranking"}"#.to_string()]);

    let status = bin()
        .args(["recommend", "--papers", papers.to_str().unwrap()])
        .args(["--citations", citations.to_str().unwrap()])
        .args(["--queries", queries.to_str().unwrap()])
        .args(["--output", output.to_str().unwrap()])
        .args(["--embedder", "http", "--embedding-url", "http://127.0.0.1:1/v1/embeddings"])
        .args(["--timeout", "5", "--log-level", "ERROR"])
        .env("NO_PROXY", "127.0.0.1")
        .env("no_proxy", "127.0.0.1")
        .status()
        .expect("Failed to run recommend");

    assert!(!status.success(), "An embedding failure should abort the run");
}

#[test]
fn test_pipeline_writes_both_outputs() {
    let dir = tempdir().unwrap();
    let (papers, citations) = create_corpus(dir.path());
    let queries = dir.path().join("queries.jsonl");
    let rank_output = dir.path().join("rank.jsonl");
    let recommend_output = dir.path().join("recs.jsonl");

    write_lines(
        &queries,
        &[format!(
            r#"{{"id": "{}", "title": "Self", "abstract": "{}"}}"#,
            PAPERS[0].0, PAPERS[0].1
        )],
    );

    let status = bin()
        .args(["pipeline", "--papers", papers.to_str().unwrap()])
        .args(["--citations", citations.to_str().unwrap()])
        .args(["--queries", queries.to_str().unwrap()])
        .args(["--rank-output", rank_output.to_str().unwrap()])
        .args(["--recommend-output", recommend_output.to_str().unwrap()])
        .args(["--exclude-self", "--top-k", "20", "--log-level", "WARN"])
        .status()
        .expect("Failed to run pipeline");

    assert!(status.success(), "Pipeline should succeed");
    assert_eq!(read_jsonl(&rank_output).len(), PAPERS.len());

    let records = read_jsonl(&recommend_output);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["query_id"], PAPERS[0].0);
    let recs = records[0]["recommendations"].as_array().unwrap();
    assert_eq!(recs.len(), PAPERS.len() - 1);
    assert!(recs.iter().all(|r| r["paper_id"] != PAPERS[0].0));
}

#[test]
fn test_end_to_end_library_flow() {
    let (store, report) =
        GraphStore::load(corpus_papers(), &corpus_edges(), &LoadOptions::default()).unwrap();
    assert_eq!(report.edges_kept, CITATIONS.len());

    let provider = CachedEmbedder::new(HashingEmbedder::new(256, 512));
    let index = SimilarityIndex::build(store.papers(), &provider).unwrap();
    assert_eq!(provider.cached_len(), PAPERS.len());

    let classifier = CitationPredictor::new(PredictorConfig {
        test_fraction: 0.0,
        ..Default::default()
    })
    .train(index.similarity_matrix(), store.citation_matrix())
    .unwrap();

    let recommender =
        Recommender::new(&store, &index, &classifier, &provider, RecommenderOptions::default());
    let query = NewPaper {
        id: None,
        title: "Embeddings".to_string(),
        abstract_text: PAPERS[3].1.to_string(),
        discipline: None,
    };
    let recs = recommender.recommend(&query, 5).unwrap();
    assert_eq!(recs.len(), 5);
    assert_eq!(recs[0].paper_id, PAPERS[3].0);

    // The query text was already embedded as a corpus abstract
    assert_eq!(provider.cached_len(), PAPERS.len());
    assert!(provider.embed("fresh text").is_ok());

    let ranking = ImpactRanker::new(RankerConfig::default()).rank(&store).unwrap();
    let top = &ranking.papers[0];
    assert!(ranking.papers.iter().all(|p| p.score <= top.score));
}
