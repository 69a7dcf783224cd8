//! Rewriting a conversational turn into a standalone search query.

use crate::config::Prompts;
use crate::error::Result;
use crate::llm::{ChatModel, CompletionRequest};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Turns the latest user message plus history into one focused query.
pub struct QueryReformulator {
    model: Arc<dyn ChatModel>,
    prompts: Arc<Prompts>,
}

impl QueryReformulator {
    pub fn new(model: Arc<dyn ChatModel>, prompts: Arc<Prompts>) -> Self {
        Self { model, prompts }
    }

    /// Reformulate `user_prompt` at temperature 0.
    ///
    /// An empty completion falls back to the trimmed `user_prompt`, so the
    /// result is never empty for non-empty input.
    #[instrument(skip(self, history), fields(history_len = history.len()))]
    pub async fn reformulate(&self, user_prompt: &str, history: &str) -> Result<String> {
        let mut vars = HashMap::new();
        vars.insert("user_prompt".to_string(), user_prompt.to_string());
        vars.insert("conversation_history".to_string(), history.to_string());

        let request = CompletionRequest::new(
            self.prompts.render_with_custom(&self.prompts.reformulation.system, &vars),
            self.prompts.render_with_custom(&self.prompts.reformulation.user, &vars),
        )
        .with_temperature(0.0);

        let raw = self.model.complete(request).await?;
        let query = raw.trim();

        if query.is_empty() {
            debug!("Reformulation was empty, using the original prompt");
            return Ok(user_prompt.trim().to_string());
        }

        debug!("Reformulated query: {}", query);
        Ok(query.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SvarError;
    use crate::test_support::ScriptedChatModel;

    fn reformulator(model: ScriptedChatModel) -> (Arc<ScriptedChatModel>, QueryReformulator) {
        let model = Arc::new(model);
        let reformulator = QueryReformulator::new(model.clone(), Arc::new(Prompts::default()));
        (model, reformulator)
    }

    #[tokio::test]
    async fn test_output_is_trimmed() {
        let (_, reformulator) = reformulator(
            ScriptedChatModel::new().with_completion("  What are the costs of studying in Finland?\n"),
        );

        let query = reformulator.reformulate("how much for finland", "").await.unwrap();
        assert_eq!(query, "What are the costs of studying in Finland?");
    }

    #[tokio::test]
    async fn test_clear_input_passes_through() {
        let question = "Which countries accept IELTS 6.0?";
        let (_, reformulator) = reformulator(ScriptedChatModel::new().with_completion(question));

        assert_eq!(reformulator.reformulate(question, "").await.unwrap(), question);
    }

    #[tokio::test]
    async fn test_empty_output_falls_back_to_prompt() {
        let (_, reformulator) = reformulator(ScriptedChatModel::new().with_completion("   \n"));

        let query = reformulator.reformulate("  Do you help with spouse visa? ", "").await.unwrap();
        assert_eq!(query, "Do you help with spouse visa?");
    }

    #[tokio::test]
    async fn test_request_is_deterministic_and_carries_history() {
        let (model, reformulator) = reformulator(ScriptedChatModel::new().with_completion("q"));

        reformulator
            .reformulate("How much does it cost?", "Human: Tell me about Finland")
            .await
            .unwrap();

        let request = model.last_request().unwrap();
        assert_eq!(request.temperature, 0.0);
        assert!(request.user.contains("USER PROMPT: How much does it cost?"));
        assert!(request.user.contains("Human: Tell me about Finland"));
        assert!(!request.user.contains("{{"));
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let (_, reformulator) = reformulator(ScriptedChatModel::new().with_failing_completion());
        let err = reformulator.reformulate("hello", "").await.unwrap_err();
        assert!(matches!(err, SvarError::ModelUnavailable(_)));
    }
}
