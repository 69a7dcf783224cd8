//! Lazily loaded, process-wide embedding model handle.

use super::{l2_normalize, Embedder, EmbeddingModel, ModelLoader};
use crate::error::{Result, SvarError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, instrument};

/// Embedder that loads its model on first use.
///
/// Concurrent first calls share a single load. A failed load is remembered:
/// every later call fails with `ModelUnavailable` without retrying.
pub struct ModelEmbedder {
    loader: Arc<dyn ModelLoader>,
    model: OnceCell<std::result::Result<Arc<dyn EmbeddingModel>, String>>,
    dimensions: usize,
}

impl ModelEmbedder {
    pub fn new(loader: Arc<dyn ModelLoader>, dimensions: usize) -> Self {
        Self {
            loader,
            model: OnceCell::new(),
            dimensions,
        }
    }

    /// Whether the model has been loaded successfully.
    pub fn is_loaded(&self) -> bool {
        matches!(self.model.get(), Some(Ok(_)))
    }

    async fn model(&self) -> Result<Arc<dyn EmbeddingModel>> {
        let loaded = self
            .model
            .get_or_init(|| async {
                info!("Loading embedding model {} (first use)", self.loader.name());
                match self.loader.load().await {
                    Ok(model) => {
                        info!("Embedding model {} loaded", self.loader.name());
                        Ok(model)
                    }
                    Err(e) => {
                        error!("Embedding model {} failed to load: {}", self.loader.name(), e);
                        Err(e.to_string())
                    }
                }
            })
            .await;

        match loaded {
            Ok(model) => Ok(model.clone()),
            Err(reason) => Err(SvarError::ModelUnavailable(reason.clone())),
        }
    }
}

#[async_trait]
impl Embedder for ModelEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| SvarError::ModelUnavailable("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.model().await?;
        let mut vectors = model
            .encode(texts)
            .await
            .map_err(|e| SvarError::ModelUnavailable(e.to_string()))?;

        if vectors.len() != texts.len() {
            return Err(SvarError::ModelUnavailable(format!(
                "Expected {} embeddings, model returned {}",
                texts.len(),
                vectors.len()
            )));
        }

        for vector in vectors.iter_mut() {
            if vector.len() != self.dimensions {
                return Err(SvarError::ModelUnavailable(format!(
                    "Embedding has {} dimensions, index expects {}",
                    vector.len(),
                    self.dimensions
                )));
            }
            l2_normalize(vector);
        }

        debug!("Generated {} embeddings", vectors.len());
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
