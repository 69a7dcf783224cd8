//! Pre-flight checks before serving or running a command.
//!
//! Validates configuration up front so that a missing key or a bad value
//! fails at startup rather than in the middle of a request.

use crate::cli::Output;
pub use crate::config::Operation;
use crate::config::{Settings, VectorIndexProvider};
use crate::error::Result;

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(settings: &Settings, operation: Operation) -> Result<()> {
    settings.validate(operation)?;

    if settings.vector_index.provider == VectorIndexProvider::Sqlite {
        std::fs::create_dir_all(settings.data_dir())?;
    }

    Ok(())
}

/// Like [`check`], but prints a hint before returning the error.
pub fn check_or_report(settings: &Settings, operation: Operation) -> Result<()> {
    check(settings, operation).inspect_err(|e| {
        Output::error(&e.to_string());
        Output::info("Run 'svar config show' to see the effective configuration.");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SvarError;

    #[test]
    fn test_missing_llm_key_fails_before_work() {
        let mut settings = Settings::default();
        settings.vector_index.provider = VectorIndexProvider::Memory;
        settings.llm.api_key = None;

        let err = check(&settings, Operation::Answer).unwrap_err();
        assert!(matches!(err, SvarError::Config(_)));
    }
}
