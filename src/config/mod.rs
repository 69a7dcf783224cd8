//! Configuration module for Svar.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{
    AnswerTemplate, FallbackPrompts, Prompts, ReformulationPrompts, DEFAULT_LANGUAGE,
};
pub use settings::{
    EmbeddingProvider, EmbeddingSettings, GeneralSettings, IngestionSettings, LlmSettings,
    Operation, PromptSettings, RetrievalSettings, ServerSettings, Settings, VectorIndexProvider,
    VectorIndexSettings,
};
