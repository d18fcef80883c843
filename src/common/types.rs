use serde::{Deserialize, Serialize};

/// A corpus paper as delivered by the ingestion layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discipline: Option<String>,
}

impl Paper {
    pub fn new(id: &str, title: &str, abstract_text: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            abstract_text: abstract_text.to_string(),
            discipline: None,
        }
    }
}

/// Directed citation: `citing` lists `cited` among its references
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CitationEdge {
    pub citing: String,
    pub cited: String,
}

impl CitationEdge {
    pub fn new(citing: &str, cited: &str) -> Self {
        Self {
            citing: citing.to_string(),
            cited: cited.to_string(),
        }
    }
}

/// A manuscript that needs citation suggestions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPaper {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discipline: Option<String>,
}

/// Counters from reading a JSONL input
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadStats {
    pub lines_read: usize,
    pub records_parsed: usize,
    pub records_skipped: usize,
}

/// Statistics from the rank step
#[derive(Debug, Clone, Default)]
pub struct RankStats {
    pub papers: usize,
    pub citations: usize,
    pub dropped_edges: usize,
    pub metrics_available: Vec<String>,
    pub records_written: usize,
}

/// Statistics from the recommend step
#[derive(Debug, Clone, Default)]
pub struct RecommendStats {
    pub papers: usize,
    pub citations: usize,
    pub training_pairs: usize,
    pub roc_auc: Option<f64>,
    pub queries_read: usize,
    pub queries_skipped: usize,
    pub recommendations_written: usize,
}
