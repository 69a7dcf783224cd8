//! Vector index abstraction for Svar.
//!
//! Provides a trait-based interface for different vector database backends.

mod memory;
mod pinecone;
mod sqlite;

pub use memory::MemoryVectorIndex;
pub use pinecone::PineconeIndex;
pub use sqlite::SqliteVectorIndex;

use crate::config::{Settings, VectorIndexProvider};
use crate::error::{Result, SvarError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Metadata stored next to each chunk vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    /// Text content of this chunk.
    pub text: String,
    /// Page the chunk came from.
    pub page: u32,
    /// Where the document was loaded from.
    pub source: String,
    /// When this chunk was stored.
    pub created_at: DateTime<Utc>,
}

/// A chunk vector ready for upsert.
#[derive(Debug, Clone)]
pub struct IndexRecord {
    /// Fresh for every ingestion; re-ingesting a PDF adds new records.
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub metadata: ChunkMetadata,
}

impl IndexRecord {
    /// Create a record with a new id and the current timestamp.
    pub fn new(text: String, page: u32, source: String, vector: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            vector,
            metadata: ChunkMetadata {
                text,
                page,
                source,
                created_at: Utc::now(),
            },
        }
    }
}

/// A ranked query match.
#[derive(Debug, Clone)]
pub struct QueryMatch {
    pub metadata: ChunkMetadata,
    /// Cosine similarity (higher is better).
    pub score: f32,
}

/// Trait for vector index implementations.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Store records, replacing any with the same id. Returns how many were stored.
    async fn upsert(&self, records: &[IndexRecord]) -> Result<usize>;

    /// Return up to `k` matches ordered by descending similarity.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<QueryMatch>>;
}

/// Create the vector index selected in settings.
pub fn create_vector_index(settings: &Settings) -> Result<Arc<dyn VectorIndex>> {
    let index: Arc<dyn VectorIndex> = match settings.vector_index.provider {
        VectorIndexProvider::Pinecone => Arc::new(PineconeIndex::from_settings(&settings.vector_index)?),
        VectorIndexProvider::Sqlite => Arc::new(SqliteVectorIndex::new(&settings.sqlite_path())?),
        VectorIndexProvider::Memory => Arc::new(MemoryVectorIndex::new()),
    };
    Ok(index)
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Sort matches best first and keep the top `k`.
pub(crate) fn rank(mut matches: Vec<QueryMatch>, k: usize) -> Vec<QueryMatch> {
    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    matches.truncate(k);
    matches
}

pub(crate) fn lock_error<E: std::fmt::Display>(e: E) -> SvarError {
    SvarError::VectorStore(format!("Failed to acquire lock: {}", e))
}
