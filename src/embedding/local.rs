//! In-process AllMiniLM-L6-v2 embeddings via fastembed.
//!
//! fastembed mean-pools token embeddings and normalizes the result, giving
//! 384-dimension unit vectors.

use super::{EmbeddingModel, ModelLoader};
use crate::error::{Result, SvarError};
use async_trait::async_trait;
use fastembed::{EmbeddingModel as FastEmbedModel, InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Loads AllMiniLM-L6-v2, downloading it into `cache_dir` on first run.
pub struct FastEmbedLoader {
    cache_dir: PathBuf,
}

impl FastEmbedLoader {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }
}

#[async_trait]
impl ModelLoader for FastEmbedLoader {
    fn name(&self) -> &str {
        "all-MiniLM-L6-v2"
    }

    async fn load(&self) -> Result<Arc<dyn EmbeddingModel>> {
        let cache_dir = self.cache_dir.clone();
        std::fs::create_dir_all(&cache_dir)?;
        info!("Loading AllMiniLM-L6-v2 from {:?} (downloads on first run)", cache_dir);

        let model = tokio::task::spawn_blocking(move || {
            TextEmbedding::try_new(
                InitOptions::new(FastEmbedModel::AllMiniLML6V2)
                    .with_cache_dir(cache_dir)
                    .with_show_download_progress(false),
            )
        })
        .await
        .map_err(|e| SvarError::ModelUnavailable(format!("Model load task failed: {}", e)))?
        .map_err(|e| SvarError::ModelUnavailable(e.to_string()))?;

        Ok(Arc::new(MiniLmModel(Arc::new(Mutex::new(model)))))
    }
}

/// Loaded fastembed model. Inference runs on the blocking pool.
struct MiniLmModel(Arc<Mutex<TextEmbedding>>);

#[async_trait]
impl EmbeddingModel for MiniLmModel {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = self.0.clone();
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let model = model
                .lock()
                .map_err(|e| SvarError::ModelUnavailable(format!("Model lock poisoned: {}", e)))?;
            model
                .embed(texts, None)
                .map_err(|e| SvarError::ModelUnavailable(e.to_string()))
        })
        .await
        .map_err(|e| SvarError::ModelUnavailable(format!("Embedding task failed: {}", e)))?
    }
}
