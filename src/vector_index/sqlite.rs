//! SQLite-based vector index implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! Suitable for a single document set; a hosted index is the better fit for
//! large collections.

use super::{cosine_similarity, lock_error, rank, ChunkMetadata, IndexRecord, QueryMatch, VectorIndex};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument, warn};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS chunks (
        id TEXT PRIMARY KEY,
        text TEXT NOT NULL,
        page INTEGER NOT NULL,
        source TEXT NOT NULL,
        created_at TEXT NOT NULL,
        embedding BLOB NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source);
"#;

/// SQLite-based vector index.
pub struct SqliteVectorIndex {
    conn: Mutex<Connection>,
}

impl SqliteVectorIndex {
    /// Open (or create) an index database at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector index at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite index (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Number of stored chunks.
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn.lock().map_err(lock_error)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn upsert(&self, records: &[IndexRecord]) -> Result<usize> {
        let conn = self.conn.lock().map_err(lock_error)?;
        let tx = conn.unchecked_transaction()?;

        for record in records {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO chunks (id, text, page, source, created_at, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    record.id.to_string(),
                    record.metadata.text,
                    record.metadata.page,
                    record.metadata.source,
                    record.metadata.created_at.to_rfc3339(),
                    Self::embedding_to_bytes(&record.vector),
                ],
            )?;
        }

        tx.commit()?;
        info!("Upserted {} chunks", records.len());
        Ok(records.len())
    }

    #[instrument(skip(self, vector))]
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<QueryMatch>> {
        let conn = self.conn.lock().map_err(lock_error)?;

        let mut stmt = conn.prepare("SELECT text, page, source, created_at, embedding FROM chunks")?;

        let rows = stmt.query_map([], |row| {
            let created_at: String = row.get(3)?;
            let embedding: Vec<u8> = row.get(4)?;

            let metadata = ChunkMetadata {
                text: row.get(0)?,
                page: row.get(1)?,
                source: row.get(2)?,
                created_at: DateTime::parse_from_rfc3339(&created_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            };
            Ok((metadata, Self::bytes_to_embedding(&embedding)))
        })?;

        let mut matches = Vec::new();
        for row in rows {
            match row {
                Ok((metadata, embedding)) => matches.push(QueryMatch {
                    score: cosine_similarity(vector, &embedding),
                    metadata,
                }),
                Err(e) => warn!("Skipping unreadable chunk row: {}", e),
            }
        }

        let ranked = rank(matches, k);
        debug!("Found {} matching chunks", ranked.len());
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_vector_index() {
        let index = SqliteVectorIndex::in_memory().unwrap();

        let near = IndexRecord::new("Finland fees".to_string(), 3, "guide.pdf".to_string(), vec![1.0, 0.0, 0.0]);
        let far = IndexRecord::new("Canada visas".to_string(), 4, "guide.pdf".to_string(), vec![0.0, 1.0, 0.0]);

        assert_eq!(index.upsert(&[near.clone(), far]).await.unwrap(), 2);
        assert_eq!(index.count().unwrap(), 2);

        let results = index.query(&[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!((results[0].score - 1.0).abs() < 0.001);
        assert_eq!(results[0].metadata.text, "Finland fees");
        assert_eq!(results[0].metadata.page, 3);
        assert_eq!(results[0].metadata.created_at.timestamp(), near.metadata.created_at.timestamp());

        index.upsert(&[near]).await.unwrap();
        assert_eq!(index.count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_index_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("vectors.db");

        {
            let index = SqliteVectorIndex::new(&path).unwrap();
            let record = IndexRecord::new("kept".to_string(), 1, "a.pdf".to_string(), vec![0.5, 0.5]);
            index.upsert(&[record]).await.unwrap();
        }

        let reopened = SqliteVectorIndex::new(&path).unwrap();
        let results = reopened.query(&[0.5, 0.5], 1).await.unwrap();
        assert_eq!(results[0].metadata.text, "kept");
    }
}
