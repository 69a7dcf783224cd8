//! Svar - Grounded answers from PDF documents
//!
//! A retrieval-augmented question answering service: a PDF is split into
//! chunks and stored in a vector index, and each question is answered by a
//! hosted language model from the passages retrieved for it.
//!
//! The name "Svar" is the Norwegian word for "answer."
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Settings and prompt templates
//! - `pdf` - PDF download and page text extraction
//! - `chunking` - Recursive character splitting of page text
//! - `embedding` - Embedding generation with a lazily loaded model
//! - `vector_index` - Vector index abstraction (Pinecone, SQLite, memory)
//! - `llm` - Chat model abstraction with streaming
//! - `rag` - Reformulation, retrieval, language routing and answer generation
//! - `orchestrator` - Turn and ingestion coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use svar::config::Settings;
//! use svar::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let mut answer = orchestrator
//!         .handle_turn(&[], "How much does it cost to study in Finland?")
//!         .await?
//!         .stream;
//!
//!     while let Some(fragment) = answer.next().await {
//!         print!("{}", fragment?);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod openai;
pub mod orchestrator;
pub mod pdf;
pub mod rag;
pub mod vector_index;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{Result, SvarError};
