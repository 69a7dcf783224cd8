//! Error types for Svar.

use thiserror::Error;

/// Library-level error type for Svar operations.
#[derive(Error, Debug)]
pub enum SvarError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Retrieval failed: {0}")]
    RetrievalFailure(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Ingestion failed: {0}")]
    Ingestion(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),
}

/// Coarse error classes that are allowed to cross the turn boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller sent nothing to answer. Recoverable by resubmitting.
    EmptyInput,
    /// Embedding or generation provider failed.
    ModelUnavailable,
    /// Vector index query failed.
    RetrievalFailure,
    /// The provider failed after the answer stream started.
    StreamInterrupted,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// Message that is safe to show to a remote caller.
    pub fn public_message(&self) -> &'static str {
        match self {
            ErrorKind::EmptyInput => "Empty question",
            ErrorKind::StreamInterrupted => "The answer stream was interrupted",
            _ => "An unexpected error occurred",
        }
    }
}

impl SvarError {
    /// Collapse this error into the kind reported to callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SvarError::EmptyInput(_) => ErrorKind::EmptyInput,
            SvarError::ModelUnavailable(_) | SvarError::OpenAI(_) => ErrorKind::ModelUnavailable,
            SvarError::RetrievalFailure(_) => ErrorKind::RetrievalFailure,
            SvarError::StreamInterrupted(_) => ErrorKind::StreamInterrupted,
            _ => ErrorKind::Internal,
        }
    }
}

/// Result type alias for Svar operations.
pub type Result<T> = std::result::Result<T, SvarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_errors_collapse_to_model_unavailable() {
        let err = SvarError::OpenAI("401 invalid api key sk-live-xyz".to_string());
        assert_eq!(err.kind(), ErrorKind::ModelUnavailable);
        assert!(!err.kind().public_message().contains("sk-live"));
    }

    #[test]
    fn test_plumbing_errors_are_internal() {
        let err = SvarError::Config("missing index".to_string());
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.kind().public_message(), "An unexpected error occurred");
    }
}
