//! Pipeline orchestrator for Svar.
//!
//! Sequences a conversational turn (reformulate, retrieve, route, generate)
//! and runs PDF ingestion into the vector index.

use crate::chunking::{chunk_pages, ChunkingConfig, TextChunk};
use crate::config::{AnswerTemplate, Prompts, Settings, DEFAULT_LANGUAGE};
use crate::embedding::{create_embedder, Embedder};
use crate::error::{ErrorKind, Result, SvarError};
use crate::llm::{ChatModel, OpenAIChatModel};
use crate::pdf::{self, PdfSource};
use crate::rag::{
    format_transcript, join_context, split_messages, AnswerGenerator, AnswerStream, ChatMessage,
    LanguageRouter, QueryReformulator, Retriever, Turn,
};
use crate::vector_index::{create_vector_index, IndexRecord, VectorIndex};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// The main orchestrator for the Svar pipeline.
pub struct Orchestrator {
    settings: Settings,
    prompts: Arc<Prompts>,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    reformulator: QueryReformulator,
    retriever: Retriever,
    router: LanguageRouter,
    generator: AnswerGenerator,
}

impl Orchestrator {
    /// Create an orchestrator from settings, wiring the configured providers.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let model: Arc<dyn ChatModel> = Arc::new(OpenAIChatModel::from_settings(&settings.llm)?);
        let embedder = create_embedder(&settings)?;
        let index = create_vector_index(&settings)?;

        Ok(Self::with_components(settings, prompts, model, embedder, index))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        model: Arc<dyn ChatModel>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        let prompts = Arc::new(prompts);

        let reformulator = QueryReformulator::new(model.clone(), prompts.clone());
        let retriever = Retriever::new(embedder.clone(), index.clone())
            .with_top_k(settings.retrieval.top_k)
            .with_min_score(settings.retrieval.min_score);
        let router = LanguageRouter::new(&prompts.answer);
        let generator = AnswerGenerator::new(model, prompts.clone())
            .with_temperature(settings.llm.temperature)
            .with_max_tokens(Some(settings.llm.max_tokens).filter(|n| *n > 0))
            .with_localized_fallback(settings.retrieval.localize_fallback);

        Self {
            settings,
            prompts,
            embedder,
            index,
            reformulator,
            retriever,
            router,
            generator,
        }
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run one turn from a raw client message list.
    pub async fn handle_messages(&self, messages: &[ChatMessage]) -> Result<PreparedAnswer> {
        let (history, question) = split_messages(messages)?;
        self.handle_turn(&history, &question).await
    }

    /// Run one turn and return the answer stream without consuming it.
    #[instrument(skip(self, history), fields(history = history.len()))]
    pub async fn handle_turn(&self, history: &[Turn], user_text: &str) -> Result<PreparedAnswer> {
        let user_text = user_text.trim();
        if user_text.is_empty() {
            return Err(SvarError::EmptyInput("Empty question".to_string()));
        }

        let transcript = format_transcript(history);
        let query = self.reformulator.reformulate(user_text, &transcript).await?;
        info!("Search query: {}", query);

        let passages = match self.retriever.retrieve(&query).await {
            Ok(passages) => passages,
            Err(e) if e.kind() == ErrorKind::RetrievalFailure => {
                warn!("Retrieval failed, answering without context: {}", e);
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        let context = join_context(&passages);

        let language = self.router.detect_language(user_text).to_string();
        debug!("Answering in template '{}' with {} passages", language, passages.len());

        let stream = self
            .generator
            .generate(&context, &query, self.template_for(&language)?)
            .await?;

        Ok(PreparedAnswer {
            query,
            language,
            passages: passages.len(),
            stream,
        })
    }

    /// The answer template for a language tag, or the default one.
    pub fn template_for(&self, language: &str) -> Result<&AnswerTemplate> {
        self.prompts
            .answer
            .get(language)
            .or_else(|| self.prompts.answer.get(DEFAULT_LANGUAGE))
            .ok_or_else(|| SvarError::Config(format!("No '{}' answer template", DEFAULT_LANGUAGE)))
    }

    /// Download, chunk, embed and store a PDF.
    #[instrument(skip(self), fields(source = %source))]
    pub async fn ingest(&self, source: &PdfSource) -> Result<IngestResult> {
        let timeout = Duration::from_secs(self.settings.ingestion.download_timeout_seconds);
        let pages = pdf::load(source, timeout).await?;

        let chunks = chunk_pages(&pages, ChunkingConfig::from(&self.settings.ingestion));
        info!("Split {} pages into {} chunks", pages.len(), chunks.len());

        let stored = self.index_chunks(&chunks, &source.name()).await?;

        Ok(IngestResult {
            source: source.name(),
            pages: pages.len(),
            chunks: chunks.len(),
            stored,
        })
    }

    /// Embed and upsert chunks in batches.
    ///
    /// A batch the index rejects is logged and skipped. Fails only when
    /// there were chunks and none could be stored.
    pub async fn index_chunks(&self, chunks: &[TextChunk], source: &str) -> Result<usize> {
        if chunks.is_empty() {
            warn!("No text chunks to index for {}", source);
            return Ok(0);
        }

        let batch_size = self.settings.ingestion.upsert_batch_size.max(1);
        let mut stored = 0;

        for (batch_no, batch) in chunks.chunks(batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;

            let records: Vec<IndexRecord> = batch
                .iter()
                .zip(vectors)
                .map(|(chunk, vector)| {
                    IndexRecord::new(chunk.text.clone(), chunk.page, source.to_string(), vector)
                })
                .collect();

            match self.index.upsert(&records).await {
                Ok(count) => stored += count,
                Err(e) => warn!("Batch {} ({} chunks) was not stored: {}", batch_no, records.len(), e),
            }
        }

        if stored == 0 {
            return Err(SvarError::Ingestion(format!(
                "None of the {} chunks could be stored",
                chunks.len()
            )));
        }

        info!("Stored {} of {} chunks", stored, chunks.len());
        Ok(stored)
    }
}

/// A turn that is ready to stream.
#[derive(Debug)]
pub struct PreparedAnswer {
    /// The reformulated search query.
    pub query: String,
    /// Tag of the answer template that was used.
    pub language: String,
    /// Number of passages in the context.
    pub passages: usize,
    pub stream: AnswerStream,
}

/// Result of ingesting a PDF.
#[derive(Debug)]
pub struct IngestResult {
    pub source: String,
    pub pages: usize,
    pub chunks: usize,
    /// Number of chunks the index accepted.
    pub stored: usize,
}
