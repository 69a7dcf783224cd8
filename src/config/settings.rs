//! Configuration settings for Svar.

use crate::error::{Result, SvarError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub vector_index: VectorIndexSettings,
    pub retrieval: RetrievalSettings,
    pub ingestion: IngestionSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.svar".to_string(),
        }
    }
}

/// Chat model settings. Any OpenAI-compatible endpoint works.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Base URL of the chat-completions API.
    pub api_base: String,
    /// Model used for both reformulation and answering.
    pub model: String,
    /// API key. Falls back to `GROQ_API_KEY`.
    pub api_key: Option<String>,
    /// Sampling temperature for answers. Reformulation always uses 0.
    pub temperature: f32,
    /// Upper bound on answer length.
    pub max_tokens: u32,
    /// HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            api_key: None,
            temperature: 0.0,
            max_tokens: 200,
            timeout_seconds: 60,
        }
    }
}

/// Embedding provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// In-process AllMiniLM-L6-v2 (requires the `local-embeddings` feature).
    #[default]
    Local,
    /// OpenAI-compatible embeddings endpoint.
    OpenAI,
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "fastembed" => Ok(EmbeddingProvider::Local),
            "openai" => Ok(EmbeddingProvider::OpenAI),
            _ => Err(format!("Unknown embedding provider: {}", s)),
        }
    }
}

impl std::fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingProvider::Local => write!(f, "local"),
            EmbeddingProvider::OpenAI => write!(f, "openai"),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions. Every vector in the index must have this length.
    pub dimensions: u32,
    /// Where the local model is cached after the first download.
    pub cache_dir: String,
    /// Base URL for the `openai` provider.
    pub api_base: String,
    /// API key for the `openai` provider. Falls back to `OPENAI_API_KEY`.
    pub api_key: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Local,
            model: "all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
            cache_dir: "~/.svar/models".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: None,
        }
    }
}

/// Vector index backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorIndexProvider {
    /// Hosted Pinecone index.
    #[default]
    Pinecone,
    /// Local SQLite file.
    Sqlite,
    /// Process memory, lost on exit.
    Memory,
}

impl std::fmt::Display for VectorIndexProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorIndexProvider::Pinecone => write!(f, "pinecone"),
            VectorIndexProvider::Sqlite => write!(f, "sqlite"),
            VectorIndexProvider::Memory => write!(f, "memory"),
        }
    }
}

/// Vector index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorIndexSettings {
    pub provider: VectorIndexProvider,
    /// Index name. Falls back to `PINECONE_INDEX_NAME`.
    pub index_name: Option<String>,
    /// Data-plane host of the index, e.g. `https://docs-abc123.svc.pinecone.io`.
    pub host: Option<String>,
    /// Optional namespace inside the index.
    pub namespace: Option<String>,
    /// API key. Falls back to `PINECONE_API_KEY`.
    pub api_key: Option<String>,
    /// Path to the SQLite database (for the sqlite provider).
    pub sqlite_path: String,
}

impl Default for VectorIndexSettings {
    fn default() -> Self {
        Self {
            provider: VectorIndexProvider::Pinecone,
            index_name: None,
            host: None,
            namespace: None,
            api_key: None,
            sqlite_path: "~/.svar/vectors.db".to_string(),
        }
    }
}

/// Retrieval policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Number of passages fetched per turn.
    pub top_k: usize,
    /// Matches scoring below this are dropped. Unset keeps every match.
    pub min_score: Option<f32>,
    /// Use the detected language's fallback text when nothing is retrieved.
    pub localize_fallback: bool,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 3,
            min_score: None,
            localize_fallback: false,
        }
    }
}

/// PDF ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionSettings {
    /// Target chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between neighbouring chunks.
    pub chunk_overlap: usize,
    /// Timeout for downloading the PDF.
    pub download_timeout_seconds: u64,
    /// Records per upsert request.
    pub upsert_batch_size: usize,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
            download_timeout_seconds: 30,
            upsert_batch_size: 100,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Ceiling for a whole request, including the streamed answer.
    pub max_request_seconds: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            max_request_seconds: 30,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

/// What the process is about to do; decides which settings must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Answer questions (HTTP server, ask, chat).
    Answer,
    /// Ingest a PDF.
    Ingest,
    /// Serve both.
    Serve,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    ///
    /// Environment overrides are applied after the file is read.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Fill unset secrets from the environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if self.llm.api_key.is_none() {
            self.llm.api_key = lookup("GROQ_API_KEY");
        }
        if self.vector_index.api_key.is_none() {
            self.vector_index.api_key = lookup("PINECONE_API_KEY");
        }
        if self.vector_index.index_name.is_none() {
            self.vector_index.index_name = lookup("PINECONE_INDEX_NAME");
        }
        if self.vector_index.host.is_none() {
            self.vector_index.host = lookup("PINECONE_INDEX_HOST");
        }
        if self.embedding.api_key.is_none() {
            self.embedding.api_key = lookup("OPENAI_API_KEY");
        }
    }

    /// Check that everything `operation` needs is configured.
    ///
    /// Called once at startup so a bad configuration never reaches a request.
    pub fn validate(&self, operation: Operation) -> Result<()> {
        if self.embedding.dimensions == 0 {
            return Err(SvarError::Config("embedding.dimensions must be positive".to_string()));
        }

        match self.embedding.provider {
            EmbeddingProvider::OpenAI => require(&self.embedding.api_key, "embedding.api_key (or OPENAI_API_KEY)")?,
            EmbeddingProvider::Local => {
                if !cfg!(feature = "local-embeddings") {
                    return Err(SvarError::Config(
                        "embedding.provider = \"local\" requires building with the local-embeddings feature".to_string(),
                    ));
                }
            }
        }

        if self.vector_index.provider == VectorIndexProvider::Pinecone {
            require(&self.vector_index.api_key, "vector_index.api_key (or PINECONE_API_KEY)")?;
            require(&self.vector_index.index_name, "vector_index.index_name (or PINECONE_INDEX_NAME)")?;
            require(&self.vector_index.host, "vector_index.host (or PINECONE_INDEX_HOST)")?;
            if let Some(host) = &self.vector_index.host {
                let candidate = if host.contains("://") {
                    host.clone()
                } else {
                    format!("https://{}", host)
                };
                url::Url::parse(&candidate)
                    .map_err(|e| SvarError::Config(format!("vector_index.host is not a URL: {}", e)))?;
            }
        }

        if matches!(operation, Operation::Answer | Operation::Serve) {
            require(&self.llm.api_key, "llm.api_key (or GROQ_API_KEY)")?;
            if self.retrieval.top_k == 0 {
                return Err(SvarError::Config("retrieval.top_k must be positive".to_string()));
            }
        }

        if matches!(operation, Operation::Ingest | Operation::Serve)
            && self.ingestion.chunk_overlap >= self.ingestion.chunk_size
        {
            return Err(SvarError::Config(
                "ingestion.chunk_overlap must be smaller than ingestion.chunk_size".to_string(),
            ));
        }

        Ok(())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| SvarError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// A copy safe to print: every secret replaced with a mask.
    pub fn redacted(&self) -> Settings {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "********".to_string());
        let mut copy = self.clone();
        copy.llm.api_key = mask(&self.llm.api_key);
        copy.embedding.api_key = mask(&self.embedding.api_key);
        copy.vector_index.api_key = mask(&self.vector_index.api_key);
        copy
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("svar")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_index.sqlite_path)
    }

    /// Get the expanded embedding model cache path.
    pub fn model_cache_dir(&self) -> PathBuf {
        Self::expand_path(&self.embedding.cache_dir)
    }
}

fn require(value: &Option<String>, name: &str) -> Result<()> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(SvarError::Config(format!("{} is not set", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn answering_settings() -> Settings {
        let mut settings = Settings::default();
        settings.embedding.provider = EmbeddingProvider::OpenAI;
        settings.embedding.api_key = Some("sk-embed".to_string());
        settings.vector_index.provider = VectorIndexProvider::Memory;
        settings.llm.api_key = Some("gsk-test".to_string());
        settings
    }

    #[test]
    fn test_defaults_match_pipeline_constants() {
        let settings = Settings::default();
        assert_eq!(settings.embedding.dimensions, 384);
        assert_eq!(settings.retrieval.top_k, 3);
        assert!(settings.retrieval.min_score.is_none());
        assert_eq!(settings.ingestion.chunk_size, 500);
        assert_eq!(settings.ingestion.chunk_overlap, 100);
        assert_eq!(settings.llm.model, "llama-3.3-70b-versatile");
    }

    #[test]
    fn test_env_fills_only_unset_values() {
        let env: HashMap<&str, &str> = [
            ("GROQ_API_KEY", "gsk-env"),
            ("PINECONE_API_KEY", "pc-env"),
            ("PINECONE_INDEX_NAME", "  "),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        settings.vector_index.api_key = Some("pc-file".to_string());
        settings.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(settings.llm.api_key.as_deref(), Some("gsk-env"));
        assert_eq!(settings.vector_index.api_key.as_deref(), Some("pc-file"));
        assert!(settings.vector_index.index_name.is_none());
    }

    #[test]
    fn test_validate_requires_llm_key_for_answering() {
        let mut settings = answering_settings();
        assert!(settings.validate(Operation::Answer).is_ok());

        settings.llm.api_key = None;
        let err = settings.validate(Operation::Answer).unwrap_err();
        assert!(matches!(err, SvarError::Config(_)));
        assert!(settings.validate(Operation::Ingest).is_ok());
    }

    #[test]
    fn test_validate_pinecone_needs_index_and_host() {
        let mut settings = answering_settings();
        settings.vector_index.provider = VectorIndexProvider::Pinecone;
        settings.vector_index.api_key = Some("pc".to_string());
        assert!(settings.validate(Operation::Answer).is_err());

        settings.vector_index.index_name = Some("docs".to_string());
        settings.vector_index.host = Some("not a url".to_string());
        assert!(settings.validate(Operation::Answer).is_err());

        settings.vector_index.host = Some("https://docs-abc.svc.pinecone.io".to_string());
        assert!(settings.validate(Operation::Answer).is_ok());
    }

    #[test]
    fn test_validate_rejects_overlap_not_smaller_than_chunk() {
        let mut settings = answering_settings();
        settings.ingestion.chunk_overlap = 500;
        assert!(settings.validate(Operation::Ingest).is_err());
    }

    #[test]
    fn test_settings_parse_partial_toml() {
        let settings: Settings = toml::from_str(
            r#"
            [retrieval]
            top_k = 5
            min_score = 0.25

            [vector_index]
            provider = "sqlite"
            "#,
        )
        .unwrap();

        assert_eq!(settings.retrieval.top_k, 5);
        assert_eq!(settings.retrieval.min_score, Some(0.25));
        assert_eq!(settings.vector_index.provider, VectorIndexProvider::Sqlite);
        assert_eq!(settings.server.port, 3000);
    }

    #[test]
    fn test_redacted_masks_secrets() {
        let settings = answering_settings().redacted();
        assert_eq!(settings.llm.api_key.as_deref(), Some("********"));
        assert!(settings.vector_index.api_key.is_none());
    }
}
