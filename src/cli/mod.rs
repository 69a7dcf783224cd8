//! CLI module for Svar.

pub mod commands;
mod output;
pub mod preflight;

pub use output::{content_preview, Output};

use clap::{Parser, Subcommand};

/// Svar - Grounded answers from your PDF documents
///
/// Ingest a PDF into a vector index, then ask questions about it from the
/// terminal or over HTTP. The name "Svar" is the Norwegian word for "answer."
#[derive(Parser, Debug)]
#[command(name = "svar")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "SVAR_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download a PDF, split it into chunks and store them in the vector index
    Ingest {
        /// http(s) URL of the PDF, or a local file path
        source: String,
    },

    /// Ask a single question and stream the answer
    Ask {
        /// The question to ask
        question: String,

        /// Also print the reformulated search query
        #[arg(long)]
        show_query: bool,
    },

    /// Start an interactive chat session
    Chat,

    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration with secrets masked
    Show,

    /// Write the default configuration file if none exists
    Init,

    /// Show configuration file path
    Path,
}
