//! Scripted fakes shared by unit tests.

use crate::embedding::{Embedder, EmbeddingModel, ModelEmbedder, ModelLoader};
use crate::error::{Result, SvarError};
use crate::llm::{ChatModel, CompletionRequest, FragmentStream};
use crate::vector_index::{IndexRecord, MemoryVectorIndex, QueryMatch, VectorIndex};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Chat model that replays a fixed completion and fragment list.
#[derive(Default)]
pub struct ScriptedChatModel {
    completion: Option<String>,
    fail_completion: bool,
    fragments: Vec<String>,
    /// Fail the stream after this many fragments.
    fail_after: Option<usize>,
    pub complete_calls: AtomicUsize,
    pub stream_calls: AtomicUsize,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedChatModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_completion(mut self, text: &str) -> Self {
        self.completion = Some(text.to_string());
        self
    }

    pub fn with_failing_completion(mut self) -> Self {
        self.fail_completion = true;
        self
    }

    pub fn with_fragments(mut self, fragments: &[&str]) -> Self {
        self.fragments = fragments.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_stream_error_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    pub fn calls(&self) -> usize {
        self.complete_calls.load(Ordering::SeqCst) + self.stream_calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);

        if self.fail_completion {
            return Err(SvarError::ModelUnavailable("scripted failure".to_string()));
        }
        Ok(self.completion.clone().unwrap_or_default())
    }

    async fn stream(&self, request: CompletionRequest) -> Result<FragmentStream> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);

        let mut items: Vec<Result<String>> = self.fragments.iter().cloned().map(Ok).collect();
        if let Some(n) = self.fail_after {
            items.truncate(n);
            items.push(Err(SvarError::StreamInterrupted("scripted disconnect".to_string())));
        }
        Ok(stream::iter(items).boxed())
    }
}

/// Bag-of-words hashing model: equal texts give equal vectors, shared words raise similarity.
pub struct HashingModel {
    dimensions: usize,
}

impl HashingModel {
    fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimensions];
        let mut any = false;

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            vector[(hasher.finish() % self.dimensions as u64) as usize] += 1.0;
            any = true;
        }

        if !any {
            vector[0] = 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingModel for HashingModel {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}

/// Loader for [`HashingModel`] that counts how often it runs.
pub struct HashingLoader {
    dimensions: usize,
    load_delay: Duration,
    pub loads: AtomicUsize,
}

impl HashingLoader {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            load_delay: Duration::ZERO,
            loads: AtomicUsize::new(0),
        }
    }

    pub fn with_load_delay_ms(mut self, ms: u64) -> Self {
        self.load_delay = Duration::from_millis(ms);
        self
    }
}

#[async_trait]
impl ModelLoader for HashingLoader {
    fn name(&self) -> &str {
        "hashing"
    }

    async fn load(&self) -> Result<Arc<dyn EmbeddingModel>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !self.load_delay.is_zero() {
            tokio::time::sleep(self.load_delay).await;
        }
        Ok(Arc::new(HashingModel {
            dimensions: self.dimensions,
        }))
    }
}

/// Loader whose model can never be loaded.
#[derive(Default)]
pub struct FailingLoader {
    pub loads: AtomicUsize,
}

#[async_trait]
impl ModelLoader for FailingLoader {
    fn name(&self) -> &str {
        "missing"
    }

    async fn load(&self) -> Result<Arc<dyn EmbeddingModel>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Err(SvarError::ModelUnavailable("model weights not found".to_string()))
    }
}

/// A ready embedder over [`HashingModel`].
pub fn hashing_embedder(dimensions: usize) -> Arc<dyn Embedder> {
    Arc::new(ModelEmbedder::new(Arc::new(HashingLoader::new(dimensions)), dimensions))
}

/// In-memory index that counts calls and can be told to fail.
#[derive(Default)]
pub struct RecordingIndex {
    pub inner: MemoryVectorIndex,
    pub queries: AtomicUsize,
    pub upserts: AtomicUsize,
    fail_queries: bool,
    /// Zero-based upsert calls that fail.
    failing_upserts: Vec<usize>,
}

impl RecordingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_queries() -> Self {
        Self {
            fail_queries: true,
            ..Self::default()
        }
    }

    pub fn with_failing_upserts(mut self, calls: &[usize]) -> Self {
        self.failing_upserts = calls.to_vec();
        self
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorIndex for RecordingIndex {
    async fn upsert(&self, records: &[IndexRecord]) -> Result<usize> {
        let call = self.upserts.fetch_add(1, Ordering::SeqCst);
        if self.failing_upserts.contains(&call) {
            return Err(SvarError::VectorStore(format!("upsert {} rejected", call)));
        }
        self.inner.upsert(records).await
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<QueryMatch>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_queries {
            return Err(SvarError::VectorStore("index offline".to_string()));
        }
        self.inner.query(vector, k).await
    }
}

/// Index that returns a fixed ranked match list regardless of the query vector.
pub struct FixedIndex {
    pub matches: Vec<QueryMatch>,
}

impl FixedIndex {
    pub fn new(ranked: &[(&str, f32)]) -> Self {
        let matches = ranked
            .iter()
            .map(|(text, score)| QueryMatch {
                metadata: IndexRecord::new(text.to_string(), 1, "fixture.pdf".to_string(), Vec::new()).metadata,
                score: *score,
            })
            .collect();
        Self { matches }
    }
}

#[async_trait]
impl VectorIndex for FixedIndex {
    async fn upsert(&self, records: &[IndexRecord]) -> Result<usize> {
        Ok(records.len())
    }

    async fn query(&self, _vector: &[f32], k: usize) -> Result<Vec<QueryMatch>> {
        Ok(self.matches.iter().take(k).cloned().collect())
    }
}
