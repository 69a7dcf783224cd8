//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::pdf::PdfSource;
use anyhow::Result;

/// Run the ingest command.
pub async fn run_ingest(source: &str, settings: Settings) -> Result<()> {
    preflight::check_or_report(&settings, Operation::Ingest)?;

    let source = PdfSource::parse(source)?;
    let orchestrator = Orchestrator::new(settings)?;

    Output::info(&format!("Ingesting {}", source));
    let spinner = Output::spinner("Downloading, chunking and embedding...");

    let result = orchestrator.ingest(&source).await;
    spinner.finish_and_clear();

    match result {
        Ok(result) => {
            Output::success(&format!("Stored {} chunks", result.stored));
            Output::kv("Pages", &result.pages.to_string());
            Output::kv("Chunks", &result.chunks.to_string());
            if result.stored < result.chunks {
                Output::warning(&format!(
                    "{} chunks were not stored; see the log for details",
                    result.chunks - result.stored
                ));
            }
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Ingestion failed: {}", e));
            Err(e.into())
        }
    }
}
