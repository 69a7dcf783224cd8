//! Grounded answer generation.

use super::stream::AnswerStream;
use crate::config::{AnswerTemplate, Prompts};
use crate::error::Result;
use crate::llm::{ChatModel, CompletionRequest};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Builds the answer prompt and streams the model's reply.
pub struct AnswerGenerator {
    model: Arc<dyn ChatModel>,
    prompts: Arc<Prompts>,
    temperature: f32,
    max_tokens: Option<u32>,
    localize_fallback: bool,
}

impl AnswerGenerator {
    pub fn new(model: Arc<dyn ChatModel>, prompts: Arc<Prompts>) -> Self {
        Self {
            model,
            prompts,
            temperature: 0.0,
            max_tokens: None,
            localize_fallback: false,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Use the template's own fallback text, when it has one.
    pub fn with_localized_fallback(mut self, enabled: bool) -> Self {
        self.localize_fallback = enabled;
        self
    }

    /// The fixed reply for a turn with no context.
    pub fn fallback_message<'a>(&'a self, template: &'a AnswerTemplate) -> &'a str {
        match (&template.fallback, self.localize_fallback) {
            (Some(localized), true) => localized,
            _ => &self.prompts.fallback.message,
        }
    }

    /// Answer `question` from `context`.
    ///
    /// Blank context returns the fallback message without calling the model.
    #[instrument(skip_all, fields(context_len = context.len()))]
    pub async fn generate(
        &self,
        context: &str,
        question: &str,
        template: &AnswerTemplate,
    ) -> Result<AnswerStream> {
        if context.trim().is_empty() {
            info!("No context retrieved, answering with the fallback message");
            return Ok(AnswerStream::fallback(self.fallback_message(template)));
        }

        let mut vars = HashMap::new();
        vars.insert("context".to_string(), context.to_string());
        vars.insert("question".to_string(), question.to_string());

        let mut request = CompletionRequest::new(
            self.prompts.render_with_custom(&template.system, &vars),
            self.prompts.render_with_custom(&template.human, &vars),
        )
        .with_temperature(self.temperature);
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let fragments = self.model.stream(request).await?;
        debug!("Answer stream started");
        Ok(AnswerStream::new(fragments))
    }
}
