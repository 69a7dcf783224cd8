//! Embedding generation for semantic search and retrieval.
//!
//! Callers depend on [`Embedder`]. The concrete model sits behind a
//! [`ModelLoader`] and is loaded on first use by [`ModelEmbedder`].

#[cfg(feature = "local-embeddings")]
mod local;
mod model;
mod openai;

#[cfg(feature = "local-embeddings")]
pub use local::FastEmbedLoader;
pub use model::ModelEmbedder;
pub use openai::{OpenAIEmbeddingLoader, OpenAIEmbeddingModel};

use crate::config::{EmbeddingProvider, Settings};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, one per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}

/// A loaded embedding model.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Encode texts, one vector per input, in input order.
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Loads an embedding model. Called at most once per [`ModelEmbedder`].
#[async_trait]
pub trait ModelLoader: Send + Sync {
    /// Human-readable model name for logs.
    fn name(&self) -> &str;

    async fn load(&self) -> Result<Arc<dyn EmbeddingModel>>;
}

/// Scale a vector to unit length. Zero vectors are left as they are.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Create the embedder selected in settings.
pub fn create_embedder(settings: &Settings) -> Result<Arc<dyn Embedder>> {
    let dimensions = settings.embedding.dimensions as usize;

    let loader: Arc<dyn ModelLoader> = match settings.embedding.provider {
        EmbeddingProvider::OpenAI => Arc::new(OpenAIEmbeddingLoader::from_settings(&settings.embedding)?),
        #[cfg(feature = "local-embeddings")]
        EmbeddingProvider::Local => Arc::new(FastEmbedLoader::new(settings.model_cache_dir())),
        #[cfg(not(feature = "local-embeddings"))]
        EmbeddingProvider::Local => {
            return Err(crate::error::SvarError::Config(
                "local embeddings are not compiled in; enable the local-embeddings feature".to_string(),
            ))
        }
    };

    Ok(Arc::new(ModelEmbedder::new(loader, dimensions)))
}
