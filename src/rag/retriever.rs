//! Retrieval of passage text for a query.

use crate::embedding::Embedder;
use crate::error::{Result, SvarError};
use crate::vector_index::VectorIndex;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Number of passages retrieved per query.
pub const DEFAULT_TOP_K: usize = 3;

/// Separator placed between passages when they are joined into context.
pub const PASSAGE_SEPARATOR: &str = "\n\n";

/// Embeds a query and looks up the closest chunks.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
    min_score: Option<f32>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            top_k: DEFAULT_TOP_K,
            min_score: None,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Drop matches scoring below `min_score`. Unset means every match counts.
    pub fn with_min_score(mut self, min_score: Option<f32>) -> Self {
        self.min_score = min_score;
        self
    }

    /// Passage texts for `query`, best match first.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<String>> {
        self.retrieve_with_k(query, self.top_k).await
    }

    #[instrument(skip(self), fields(query = %query))]
    pub async fn retrieve_with_k(&self, query: &str, k: usize) -> Result<Vec<String>> {
        let vector = self.embedder.embed(query).await?;

        let matches = self.index.query(&vector, k).await.map_err(|e| match e {
            SvarError::RetrievalFailure(_) => e,
            other => SvarError::RetrievalFailure(other.to_string()),
        })?;

        let passages: Vec<String> = matches
            .into_iter()
            .filter(|m| self.min_score.map_or(true, |min| m.score >= min))
            .map(|m| m.metadata.text)
            .collect();

        debug!("Retrieved {} passages", passages.len());
        Ok(passages)
    }
}

/// Join passages into a single context string.
pub fn join_context(passages: &[String]) -> String {
    passages.join(PASSAGE_SEPARATOR)
}
