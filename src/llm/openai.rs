//! OpenAI-compatible chat completions (Groq by default).

use super::{ChatModel, CompletionRequest, FragmentStream};
use crate::config::LlmSettings;
use crate::error::{Result, SvarError};
use crate::openai::create_client_with_timeout;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs, CreateChatCompletionStreamResponse,
};
use async_openai::Client;
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Chat model backed by an OpenAI-compatible API.
pub struct OpenAIChatModel {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIChatModel {
    /// Create a chat model from settings. The API key must already be resolved.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        let api_key = settings
            .api_key
            .as_deref()
            .ok_or_else(|| SvarError::Config("llm.api_key is not set".to_string()))?;

        let client = create_client_with_timeout(
            &settings.api_base,
            api_key,
            Duration::from_secs(settings.timeout_seconds),
        )?;

        Ok(Self::with_client(client, &settings.model))
    }

    /// Create a chat model around an existing client.
    pub fn with_client(client: Client<OpenAIConfig>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }

    fn build_request(&self, request: CompletionRequest) -> Result<CreateChatCompletionRequest> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system)
                .build()
                .map_err(|e| SvarError::OpenAI(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.user)
                .build()
                .map_err(|e| SvarError::OpenAI(e.to_string()))?
                .into(),
        ];

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages(messages)
            .temperature(request.temperature);
        if let Some(max_tokens) = request.max_tokens {
            builder.max_completion_tokens(max_tokens);
        }

        builder.build().map_err(|e| SvarError::OpenAI(e.to_string()))
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let request = self.build_request(request)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            SvarError::ModelUnavailable(format!("Chat completion failed: {}", e))
        })?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        debug!("Completion returned {} chars", text.len());
        Ok(text)
    }

    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn stream(&self, request: CompletionRequest) -> Result<FragmentStream> {
        let request = self.build_request(request)?;

        let stream = self.client.chat().create_stream(request).await.map_err(|e| {
            SvarError::ModelUnavailable(format!("Failed to start answer stream: {}", e))
        })?;

        let fragments = stream.filter_map(|item| async move {
            match item {
                Ok(chunk) => delta_text(chunk).map(Ok),
                Err(e) => {
                    warn!("Answer stream failed: {}", e);
                    Some(Err(SvarError::StreamInterrupted(e.to_string())))
                }
            }
        });

        Ok(fragments.boxed())
    }
}

/// Concatenated delta text of a streamed chunk; `None` for content-free chunks.
fn delta_text(chunk: CreateChatCompletionStreamResponse) -> Option<String> {
    let text: String = chunk
        .choices
        .into_iter()
        .filter_map(|choice| choice.delta.content)
        .collect();

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
