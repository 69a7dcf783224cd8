//! In-memory vector index implementation.
//!
//! Useful for testing and small datasets.

use super::{cosine_similarity, lock_error, rank, IndexRecord, QueryMatch, VectorIndex};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// In-memory vector index.
pub struct MemoryVectorIndex {
    records: RwLock<HashMap<Uuid, IndexRecord>>,
}

impl MemoryVectorIndex {
    /// Create a new in-memory vector index.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn upsert(&self, records: &[IndexRecord]) -> Result<usize> {
        let mut store = self.records.write().map_err(lock_error)?;
        for record in records {
            store.insert(record.id, record.clone());
        }
        Ok(records.len())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<QueryMatch>> {
        let store = self.records.read().map_err(lock_error)?;

        let matches = store
            .values()
            .map(|record| QueryMatch {
                metadata: record.metadata.clone(),
                score: cosine_similarity(vector, &record.vector),
            })
            .collect();

        Ok(rank(matches, k))
    }
}
