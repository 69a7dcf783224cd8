//! Pinecone data-plane client.
//!
//! Only upsert and query are used. The index itself (dimension 384, cosine
//! metric) is provisioned outside this process.

use super::{ChunkMetadata, IndexRecord, QueryMatch, VectorIndex};
use crate::config::VectorIndexSettings;
use crate::error::{Result, SvarError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const API_VERSION: &str = "2024-07";

/// Client for one Pinecone index.
pub struct PineconeIndex {
    client: reqwest::Client,
    host: String,
    index_name: String,
    api_key: String,
    namespace: Option<String>,
}

impl PineconeIndex {
    pub fn new(host: &str, index_name: &str, api_key: &str, namespace: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SvarError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", host.trim_end_matches('/'))
        };

        Ok(Self {
            client,
            host,
            index_name: index_name.to_string(),
            api_key: api_key.to_string(),
            namespace,
        })
    }

    pub fn from_settings(settings: &VectorIndexSettings) -> Result<Self> {
        let missing = |name: &str| SvarError::Config(format!("vector_index.{} is not set", name));

        Self::new(
            settings.host.as_deref().ok_or_else(|| missing("host"))?,
            settings.index_name.as_deref().ok_or_else(|| missing("index_name"))?,
            settings.api_key.as_deref().ok_or_else(|| missing("api_key"))?,
            settings.namespace.clone(),
        )
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(format!("{}{}", self.host, path))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SvarError::VectorStore(format!(
                "Pinecone {} returned {}: {}",
                path, status, text
            )));
        }

        Ok(response.json().await?)
    }
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<PineconeVector<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Serialize)]
struct PineconeVector<'a> {
    id: String,
    values: &'a [f32],
    metadata: &'a ChunkMetadata,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<PineconeMatch>,
}

#[derive(Deserialize)]
struct PineconeMatch {
    id: String,
    #[serde(default)]
    score: f32,
    metadata: Option<serde_json::Value>,
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    #[instrument(skip(self, records), fields(index = %self.index_name, count = records.len()))]
    async fn upsert(&self, records: &[IndexRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let request = UpsertRequest {
            vectors: records
                .iter()
                .map(|r| PineconeVector {
                    id: r.id.to_string(),
                    values: &r.vector,
                    metadata: &r.metadata,
                })
                .collect(),
            namespace: self.namespace.as_deref(),
        };

        let response: UpsertResponse = self.post("/vectors/upsert", &request).await?;
        info!("Pinecone stored {} vectors", response.upserted_count);
        Ok(response.upserted_count)
    }

    #[instrument(skip(self, vector), fields(index = %self.index_name))]
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<QueryMatch>> {
        let request = QueryRequest {
            vector,
            top_k: k,
            include_metadata: true,
            namespace: self.namespace.as_deref(),
        };

        let response: QueryResponse = self
            .post("/query", &request)
            .await
            .map_err(|e| SvarError::RetrievalFailure(e.to_string()))?;

        debug!("Pinecone returned {} matches", response.matches.len());
        Ok(parse_matches(response.matches))
    }
}

/// Metadata as Pinecone returns it. Only `text` is required: older records
/// carry just `{text, page}`, and numbers come back as float64.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredMetadata {
    text: String,
    #[serde(default)]
    page: Option<f64>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

impl From<StoredMetadata> for ChunkMetadata {
    fn from(stored: StoredMetadata) -> Self {
        let created_at = stored
            .created_at
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_default();

        Self {
            text: stored.text,
            page: stored.page.map_or(0, |p| p.max(0.0) as u32),
            source: stored.source.unwrap_or_default(),
            created_at,
        }
    }
}

/// Keep matches whose metadata carries chunk text; Pinecone already ranks them.
fn parse_matches(matches: Vec<PineconeMatch>) -> Vec<QueryMatch> {
    matches
        .into_iter()
        .filter_map(|m| {
            let metadata = m.metadata?;
            match serde_json::from_value::<StoredMetadata>(metadata) {
                Ok(metadata) => Some(QueryMatch {
                    metadata: metadata.into(),
                    score: m.score,
                }),
                Err(e) => {
                    warn!("Skipping match {} without chunk text: {}", m.id, e);
                    None
                }
            }
        })
        .collect()
}
