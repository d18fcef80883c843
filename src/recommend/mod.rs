//! Top-K citation suggestions for a new manuscript.

use serde::Serialize;

use crate::common::NewPaper;
use crate::embedding::EmbeddingProvider;
use crate::error::EmbeddingError;
use crate::graph::GraphStore;
use crate::predictor::TrainedClassifier;
use crate::similarity::SimilarityIndex;

pub const DEFAULT_TOP_K: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct RecommenderOptions {
    /// Drop the corpus paper whose id equals the query's id. Off by default,
    /// so a query already in the corpus recommends itself first.
    pub exclude_self: bool,
}

/// One suggested citation
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub paper_id: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub probability: f64,
    pub similarity: f32,
}

pub struct Recommender<'a, P: ?Sized> {
    store: &'a GraphStore,
    index: &'a SimilarityIndex,
    classifier: &'a TrainedClassifier,
    provider: &'a P,
    options: RecommenderOptions,
}

impl<'a, P: EmbeddingProvider + ?Sized> Recommender<'a, P> {
    pub fn new(
        store: &'a GraphStore,
        index: &'a SimilarityIndex,
        classifier: &'a TrainedClassifier,
        provider: &'a P,
        options: RecommenderOptions,
    ) -> Self {
        Self {
            store,
            index,
            classifier,
            provider,
            options,
        }
    }

    /// Rank every corpus paper by predicted citation probability and return
    /// the first `top_k`. Equal probabilities keep corpus order.
    pub fn recommend(
        &self,
        query: &NewPaper,
        top_k: usize,
    ) -> Result<Vec<Recommendation>, EmbeddingError> {
        let embedding = self.provider.embed(&query.abstract_text)?;
        let similarities = self.index.similarity_against(&embedding);
        let probabilities = self.classifier.predict_probability(&similarities);

        let excluded = if self.options.exclude_self {
            query.id.as_deref().and_then(|id| self.store.index_of(id))
        } else {
            None
        };

        let mut order: Vec<usize> = (0..probabilities.len())
            .filter(|&i| Some(i) != excluded)
            .collect();
        // Stable sort: ties stay in corpus order
        order.sort_by(|&a, &b| probabilities[b].total_cmp(&probabilities[a]));
        order.truncate(top_k);

        Ok(order
            .into_iter()
            .map(|i| {
                let paper = self.store.paper(i);
                Recommendation {
                    paper_id: paper.id.clone(),
                    abstract_text: paper.abstract_text.clone(),
                    probability: probabilities[i],
                    similarity: similarities[i],
                }
            })
            .collect())
    }
}
