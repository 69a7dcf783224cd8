//! Chat model abstraction used by reformulation and answer generation.

mod openai;

pub use openai::OpenAIChatModel;

use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// A lazily produced sequence of text fragments, in generation order.
pub type FragmentStream = BoxStream<'static, Result<String>>;

/// A single two-message prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// Create a deterministic (temperature 0) request.
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: 0.0,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Trait for chat model providers.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Return the whole completion at once.
    async fn complete(&self, request: CompletionRequest) -> Result<String>;

    /// Start a completion and return its fragments as they are generated.
    ///
    /// Errors before the first fragment are returned directly; errors after
    /// that arrive as a `StreamInterrupted` item.
    async fn stream(&self, request: CompletionRequest) -> Result<FragmentStream>;
}
