//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::{content_preview, Output};
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::rag::{AnswerStream, StreamEvent};
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(question: &str, show_query: bool, settings: Settings) -> Result<()> {
    preflight::check_or_report(&settings, Operation::Answer)?;

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Searching knowledge base...");
    let prepared = match orchestrator.handle_turn(&[], question).await {
        Ok(prepared) => {
            spinner.finish_and_clear();
            prepared
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to answer: {}", e));
            return Err(e.into());
        }
    };

    if show_query {
        Output::kv("Query", &content_preview(&prepared.query, 200));
    }

    println!();
    print_answer(prepared.stream).await?;
    println!();

    Ok(())
}

/// Print fragments as they arrive. Returns the full text.
pub(crate) async fn print_answer(mut stream: AnswerStream) -> Result<String> {
    let mut answer = String::new();

    loop {
        match stream.next_event().await {
            StreamEvent::Fragment(text) => {
                Output::fragment(&text);
                answer.push_str(&text);
            }
            StreamEvent::End => {
                println!();
                return Ok(answer);
            }
            StreamEvent::Error(e) => {
                println!();
                Output::error(&format!("Answer interrupted: {}", e));
                return Err(e.into());
            }
        }
    }
}
