//! Qdrant-backed [`VectorIndex`] over the REST API.
//!
//! | Operation | Request |
//! |-----------|---------|
//! | ensure collection | `GET /collections/{c}`, then `PUT /collections/{c}` on 404 |
//! | add | `PUT /collections/{c}/points?wait=true` |
//! | search | `POST /collections/{c}/points/search` |
//! | count | `POST /collections/{c}/points/count` |
//!
//! Each point stores the chunk text, source file name, page and chunk
//! index as payload; search hits are rebuilt from that payload.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use pdf_rag_core::models::{DocumentChunk, IndexedChunk, ScoredChunk};
use pdf_rag_core::store::{check_dims, CollectionSpec, VectorIndex};
use pdf_rag_core::{RagError, Result};

use crate::config::VectorStoreConfig;

pub struct QdrantIndex {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    spec: CollectionSpec,
}

#[derive(Serialize, Deserialize)]
struct PointPayload {
    text: String,
    source_file: String,
    page: u32,
    chunk_index: usize,
}

#[derive(Serialize)]
struct Point<'a> {
    id: &'a str,
    vector: &'a [f32],
    payload: PointPayload,
}

#[derive(Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Deserialize)]
struct SearchHit {
    id: serde_json::Value,
    score: f32,
    payload: Option<PointPayload>,
}

#[derive(Deserialize)]
struct CountResult {
    count: usize,
}

impl QdrantIndex {
    pub fn new(config: &VectorStoreConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            spec: CollectionSpec::new(config.collection.clone(), config.dims),
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.base_url, self.spec.name)
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("api-key", &self.api_key)
    }

    /// Send and fail on transport errors or non-2xx statuses.
    async fn send(&self, builder: reqwest::RequestBuilder, what: &str) -> Result<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| RagError::upstream(format!("qdrant {} failed: {}", what, e)))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::upstream(format!(
                "qdrant {} returned {}: {}",
                what, status, body
            )));
        }
        Ok(response)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let text = response
            .text()
            .await
            .map_err(|e| RagError::upstream(format!("qdrant response read failed: {}", e)))?;
        Ok(serde_json::from_str(&text)?)
    }

    fn check_existing_size(&self, info: &serde_json::Value) -> Result<()> {
        let size = info
            .pointer("/result/config/params/vectors/size")
            .and_then(|v| v.as_u64());
        match size {
            Some(size) if size as usize != self.spec.dims => Err(RagError::Config(format!(
                "collection '{}' holds {}-dim vectors, configured for {}",
                self.spec.name, size, self.spec.dims
            ))),
            // Named-vector collections have no top-level size; accept them as-is.
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    fn spec(&self) -> &CollectionSpec {
        &self.spec
    }

    async fn ensure_collection(&self) -> Result<()> {
        let response = self
            .request(reqwest::Method::GET, self.collection_url())
            .send()
            .await
            .map_err(|e| RagError::upstream(format!("qdrant collection lookup failed: {}", e)))?;

        if response.status().is_success() {
            let info: serde_json::Value = Self::read_json(response).await?;
            return self.check_existing_size(&info);
        }
        if response.status() != reqwest::StatusCode::NOT_FOUND {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::upstream(format!(
                "qdrant collection lookup returned {}: {}",
                status, body
            )));
        }

        let body = json!({
            "vectors": {
                "size": self.spec.dims,
                "distance": self.spec.distance.as_str(),
            }
        });
        self.send(
            self.request(reqwest::Method::PUT, self.collection_url())
                .json(&body),
            "create collection",
        )
        .await?;

        tracing::info!(
            collection = %self.spec.name,
            dims = self.spec.dims,
            "created vector collection"
        );
        Ok(())
    }

    async fn add(&self, chunks: &[IndexedChunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        check_dims(&self.spec, chunks)?;

        let points: Vec<Point<'_>> = chunks
            .iter()
            .map(|c| Point {
                id: &c.chunk.id,
                vector: &c.vector,
                payload: PointPayload {
                    text: c.chunk.text.clone(),
                    source_file: c.chunk.source_file.clone(),
                    page: c.chunk.page,
                    chunk_index: c.chunk.chunk_index,
                },
            })
            .collect();

        self.send(
            self.request(
                reqwest::Method::PUT,
                format!("{}/points?wait=true", self.collection_url()),
            )
            .json(&json!({ "points": points })),
            "upsert points",
        )
        .await?;

        tracing::debug!(collection = %self.spec.name, points = chunks.len(), "stored points");
        Ok(())
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if query.len() != self.spec.dims {
            return Err(RagError::invalid_input(format!(
                "query vector has {} dims, collection expects {}",
                query.len(),
                self.spec.dims
            )));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let response = self
            .send(
                self.request(
                    reqwest::Method::POST,
                    format!("{}/points/search", self.collection_url()),
                )
                .json(&json!({
                    "vector": query,
                    "limit": k,
                    "with_payload": true,
                })),
                "search",
            )
            .await?;

        let envelope: Envelope<Vec<SearchHit>> = Self::read_json(response).await?;
        let mut hits = envelope
            .result
            .into_iter()
            .map(hit_to_chunk)
            .collect::<Result<Vec<_>>>()?;

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        let response = self
            .send(
                self.request(
                    reqwest::Method::POST,
                    format!("{}/points/count", self.collection_url()),
                )
                .json(&json!({ "exact": true })),
                "count",
            )
            .await?;

        let envelope: Envelope<CountResult> = Self::read_json(response).await?;
        Ok(envelope.result.count)
    }
}

fn hit_to_chunk(hit: SearchHit) -> Result<ScoredChunk> {
    let payload = hit
        .payload
        .ok_or_else(|| RagError::response_format("search hit has no payload"))?;
    let id = match hit.id {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    };
    Ok(ScoredChunk {
        chunk: DocumentChunk {
            id,
            text: payload.text,
            source_file: payload.source_file,
            page: payload.page,
            chunk_index: payload.chunk_index,
        },
        score: hit.score,
    })
}
