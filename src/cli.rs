use clap::{Args, Parser, Subcommand};

use crate::embedding::EmbedderKind;

#[derive(Parser)]
#[command(name = "citegraph")]
#[command(about = "Rank papers by citation impact and recommend citations for new manuscripts")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score every corpus paper by PageRank, HITS hub and eigenvector centrality
    Rank(RankArgs),

    /// Suggest corpus papers that new manuscripts should cite
    Recommend(RecommendArgs),

    /// Run rank and recommend over a single load of the corpus
    Pipeline(PipelineArgs),
}

/// Corpus inputs shared by every command
#[derive(Args, Clone, Debug)]
pub struct CorpusArgs {
    /// Papers JSONL (id, title, abstract, discipline); .gz accepted
    #[arg(short, long, required = true)]
    pub papers: String,

    /// Citations JSONL (citing, cited); .gz accepted
    #[arg(short, long, required = true)]
    pub citations: String,

    /// Fail when a citation references a paper outside the corpus
    #[arg(long, default_value = "false")]
    pub strict: bool,

    /// Worker threads for parallel steps (default: number of CPUs)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Logging level (DEBUG, INFO, WARN, ERROR)
    #[arg(short, long, default_value = "INFO")]
    pub log_level: String,
}

#[derive(Args, Clone, Debug)]
pub struct RankingArgs {
    /// Fusion weights as metric=weight pairs, e.g. "pagerank=0.5,hub=0.25,eigenvector=0.25".
    /// Unnamed metrics keep their default (1/3 each, authority 0)
    #[arg(long)]
    pub weights: Option<String>,

    /// PageRank damping factor
    #[arg(long, default_value = "0.85")]
    pub damping: f64,

    /// Iteration budget for each centrality algorithm
    #[arg(long, default_value = "100")]
    pub max_iterations: usize,

    /// Node id prefixes that are not papers (skipped by eigenvector centrality)
    #[arg(long = "exclude-prefix", default_value = "_:")]
    pub exclude_prefixes: Vec<String>,
}

#[derive(Args, Clone, Debug)]
pub struct EmbedderArgs {
    /// Embedding provider
    #[arg(long, value_enum, default_value = "hashing")]
    pub embedder: EmbedderKind,

    /// Vector size for the hashing embedder
    #[arg(long, default_value = "384")]
    pub embedding_dim: usize,

    /// Endpoint for the http embedder (OpenAI-compatible /embeddings)
    #[arg(long)]
    pub embedding_url: Option<String>,

    /// Model name sent to the http embedder
    #[arg(long, default_value = "all-MiniLM-L6-v2")]
    pub embedding_model: String,

    /// Bearer token for the http embedder
    #[arg(long, env = "CITEGRAPH_EMBEDDING_API_KEY", hide_env_values = true)]
    pub embedding_api_key: Option<String>,

    /// Input texts are cut to this many whitespace tokens before embedding
    #[arg(long, default_value = "512")]
    pub max_tokens: usize,

    /// Concurrent embedding requests
    #[arg(long, default_value = "8")]
    pub concurrency: usize,

    /// Timeout in seconds per embedding request
    #[arg(short, long, default_value = "30")]
    pub timeout: u64,

    /// Texts per embedding call
    #[arg(long, default_value = "64")]
    pub batch_size: usize,
}

#[derive(Args, Clone, Debug)]
pub struct PredictorArgs {
    /// Share of training pairs held out for ROC-AUC (0 disables evaluation)
    #[arg(long, default_value = "0.2")]
    pub test_fraction: f64,

    /// Train on all citing pairs plus this many non-citing pairs per citing pair
    #[arg(long)]
    pub negative_ratio: Option<f64>,

    /// Inverse L2 regularization strength
    #[arg(long, default_value = "1.0")]
    pub regularization: f64,

    /// Seed for the train/test split and negative sampling
    #[arg(long, default_value = "42")]
    pub seed: u64,
}

#[derive(Parser, Clone, Debug)]
pub struct RankArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    #[command(flatten)]
    pub ranking: RankingArgs,

    /// Output JSONL of ranked papers
    #[arg(short, long, default_value = "impact_ranking.jsonl")]
    pub output: String,
}

#[derive(Parser, Clone, Debug)]
pub struct RecommendArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    #[command(flatten)]
    pub embedder: EmbedderArgs,

    #[command(flatten)]
    pub predictor: PredictorArgs,

    /// New manuscripts JSONL (title, abstract, discipline, optional id)
    #[arg(short, long, required = true)]
    pub queries: String,

    /// Output JSONL, one line of recommendations per query
    #[arg(short, long, default_value = "recommendations.jsonl")]
    pub output: String,

    /// Recommendations per query
    #[arg(short = 'k', long, default_value = "5")]
    pub top_k: usize,

    /// Skip the corpus paper whose id equals the query id
    #[arg(long, default_value = "false")]
    pub exclude_self: bool,
}

#[derive(Parser, Clone, Debug)]
pub struct PipelineArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    #[command(flatten)]
    pub ranking: RankingArgs,

    #[command(flatten)]
    pub embedder: EmbedderArgs,

    #[command(flatten)]
    pub predictor: PredictorArgs,

    /// New manuscripts JSONL (title, abstract, discipline, optional id)
    #[arg(short, long, required = true)]
    pub queries: String,

    /// Output JSONL of ranked papers
    #[arg(long, default_value = "impact_ranking.jsonl")]
    pub rank_output: String,

    /// Output JSONL of recommendations
    #[arg(long, default_value = "recommendations.jsonl")]
    pub recommend_output: String,

    /// Recommendations per query
    #[arg(short = 'k', long, default_value = "5")]
    pub top_k: usize,

    /// Skip the corpus paper whose id equals the query id
    #[arg(long, default_value = "false")]
    pub exclude_self: bool,
}
