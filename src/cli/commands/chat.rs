//! Interactive chat command.
//!
//! The session owns the conversation history and passes it to the
//! orchestrator by value on every turn.

use super::ask::print_answer;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::rag::Turn;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};
use tracing::debug;

/// Number of turns kept in history.
const MAX_HISTORY: usize = 20;

/// Run the interactive chat command.
pub async fn run_chat(settings: Settings) -> Result<()> {
    preflight::check_or_report(&settings, Operation::Answer)?;

    let orchestrator = Orchestrator::new(settings)?;
    let mut session = ChatSession::default();

    println!("\n{}", style("Svar Chat").bold().cyan());
    println!(
        "{}\n",
        style("Type your questions, or 'exit' to quit. Use 'clear' to reset conversation.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            session.clear();
            Output::info("Conversation history cleared.");
            continue;
        }

        let prepared = match orchestrator.handle_turn(session.history(), input).await {
            Ok(prepared) => prepared,
            Err(e) => {
                Output::error(&format!("Error: {}", e));
                continue;
            }
        };
        debug!("Query: {}", prepared.query);

        print!("\n{} ", style("Svar:").cyan().bold());
        match print_answer(prepared.stream).await {
            Ok(answer) => session.record(input, &answer),
            // Keep the question so a follow-up can refer back to it
            Err(_) => session.record(input, ""),
        }
        println!();
    }

    Ok(())
}

#[derive(Debug, Default)]
struct ChatSession {
    history: Vec<Turn>,
}

impl ChatSession {
    fn history(&self) -> &[Turn] {
        &self.history
    }

    fn record(&mut self, question: &str, answer: &str) {
        self.history.push(Turn::user(question));
        if !answer.is_empty() {
            self.history.push(Turn::assistant(answer));
        }

        if self.history.len() > MAX_HISTORY {
            let excess = self.history.len() - MAX_HISTORY;
            self.history.drain(..excess);
        }
    }

    fn clear(&mut self) {
        self.history.clear();
    }
}
