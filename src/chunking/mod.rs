//! Splitting extracted page text into retrieval-sized chunks.

mod recursive;

pub use recursive::RecursiveSplitter;

use crate::config::IngestionSettings;
use crate::pdf::PageText;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static INLINE_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").unwrap());
static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n(\s*\n)*").unwrap());

/// A chunk of document text with the page it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    pub text: String,
    pub page: u32,
}

/// Configuration for chunking.
#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters repeated at the start of the next chunk.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
        }
    }
}

impl From<&IngestionSettings> for ChunkingConfig {
    fn from(settings: &IngestionSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
        }
    }
}

/// Collapse runs of inline whitespace and blank lines, keeping paragraph breaks.
pub fn normalize_whitespace(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let text = INLINE_SPACE.replace_all(&text, " ");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    text.lines().map(str::trim).collect::<Vec<_>>().join("\n").trim().to_string()
}

/// Split every page and drop chunks that are only whitespace.
pub fn chunk_pages(pages: &[PageText], config: ChunkingConfig) -> Vec<TextChunk> {
    let splitter = RecursiveSplitter::new(config);

    pages
        .iter()
        .flat_map(|page| {
            splitter
                .split(&normalize_whitespace(&page.text))
                .into_iter()
                .map(move |text| TextChunk {
                    text,
                    page: page.number,
                })
        })
        .filter(|chunk| !chunk.text.trim().is_empty())
        .collect()
}
