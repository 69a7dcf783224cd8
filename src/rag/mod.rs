//! RAG (Retrieval-Augmented Generation) pipeline stages.
//!
//! A turn flows through [`QueryReformulator`], [`Retriever`],
//! [`LanguageRouter`] and [`AnswerGenerator`]; the orchestrator sequences them.

mod conversation;
mod generator;
mod language;
mod reformulate;
mod retriever;
mod stream;

pub use conversation::{format_transcript, split_messages, ChatMessage, MessagePart, Role, Turn};
pub use generator::AnswerGenerator;
pub use language::LanguageRouter;
pub use reformulate::QueryReformulator;
pub use retriever::{join_context, Retriever, DEFAULT_TOP_K, PASSAGE_SEPARATOR};
pub use stream::{AnswerStream, StreamEvent};
