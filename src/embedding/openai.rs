//! OpenAI-compatible embeddings implementation.

use super::{EmbeddingModel, ModelLoader};
use crate::config::EmbeddingSettings;
use crate::error::{Result, SvarError};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_openai::Client;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Remote embedding model. The endpoint is asked for exactly `dimensions` values.
pub struct OpenAIEmbeddingModel {
    client: Client<OpenAIConfig>,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbeddingModel {
    pub fn new(client: Client<OpenAIConfig>, model: &str, dimensions: usize) -> Self {
        Self {
            client,
            model: model.to_string(),
            dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingModel for OpenAIEmbeddingModel {
    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // OpenAI has a limit on batch size, process in chunks
        const BATCH_SIZE: usize = 100;
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(BATCH_SIZE) {
            let request = CreateEmbeddingRequestArgs::default()
                .model(&self.model)
                .input(EmbeddingInput::StringArray(chunk.to_vec()))
                .dimensions(self.dimensions as u32)
                .build()
                .map_err(|e| SvarError::OpenAI(format!("Failed to build request: {}", e)))?;

            let response = self
                .client
                .embeddings()
                .create(request)
                .await
                .map_err(|e| SvarError::OpenAI(format!("Embedding API error: {}", e)))?;

            // Sort by index to ensure correct order
            let mut embeddings: Vec<_> = response.data.into_iter().collect();
            embeddings.sort_by_key(|e| e.index);
            all_embeddings.extend(embeddings.into_iter().map(|e| e.embedding));
        }

        debug!("Encoded {} texts", all_embeddings.len());
        Ok(all_embeddings)
    }
}

/// Loader for [`OpenAIEmbeddingModel`]. Loading only builds the client.
pub struct OpenAIEmbeddingLoader {
    api_base: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbeddingLoader {
    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| SvarError::Config("embedding.api_key is not set".to_string()))?;

        Ok(Self {
            api_base: settings.api_base.clone(),
            api_key,
            model: settings.model.clone(),
            dimensions: settings.dimensions as usize,
        })
    }
}

#[async_trait]
impl ModelLoader for OpenAIEmbeddingLoader {
    fn name(&self) -> &str {
        &self.model
    }

    async fn load(&self) -> Result<Arc<dyn EmbeddingModel>> {
        let client = create_client(&self.api_base, &self.api_key)?;
        Ok(Arc::new(OpenAIEmbeddingModel::new(client, &self.model, self.dimensions)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loader_creation() {
        let mut settings = EmbeddingSettings::default();
        assert!(OpenAIEmbeddingLoader::from_settings(&settings).is_err());

        settings.model = "text-embedding-3-small".to_string();
        settings.api_key = Some("sk-test".to_string());
        let loader = OpenAIEmbeddingLoader::from_settings(&settings).unwrap();
        assert_eq!(loader.name(), "text-embedding-3-small");
        assert_eq!(loader.dimensions, 384);
    }
}
