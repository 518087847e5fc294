//! Embedding provider implementations.
//!
//! Implements [`Embedder`] for:
//! - **[`LocalEmbedder`]**: runs a model in-process via fastembed; no network
//!   calls after the first model download. Default: `bge-small-en-v1.5`
//!   (384 dims).
//! - **[`OpenAiEmbedder`]**: calls an OpenAI-compatible `POST /embeddings`
//!   endpoint.
//!
//! Use [`create_embedder`] to build the configured provider. The returned
//! instance is shared by ingestion and query, so both sides always embed
//! with the same model.
//!
//! Failures are not retried: transport and status errors map to
//! [`RagError::Upstream`], malformed bodies to [`RagError::ResponseFormat`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use pdf_rag_core::embedding::Embedder;
use pdf_rag_core::{RagError, Result};

use crate::config::EmbeddingConfig;

pub const DEFAULT_LOCAL_MODEL: &str = "bge-small-en-v1.5";
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";

/// Build the embedder named by `config.provider`.
///
/// `dims` is the collection dimensionality; a provider whose model produces
/// a different size is rejected here rather than at the first write.
pub async fn create_embedder(config: &EmbeddingConfig, dims: usize) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiEmbedder::new(config, dims)?)),
        #[cfg(feature = "local-embeddings-fastembed")]
        "local" => Ok(Arc::new(LocalEmbedder::load(config, dims).await?)),
        #[cfg(not(feature = "local-embeddings-fastembed"))]
        "local" => Err(RagError::Config(
            "Local embedding provider requires --features local-embeddings-fastembed".to_string(),
        )),
        other => Err(RagError::Config(format!(
            "Unknown embedding provider: {}",
            other
        ))),
    }
}

// ============ OpenAI-compatible Provider ============

/// Embedder backed by an OpenAI-compatible embeddings endpoint.
///
/// The API key comes from `embedding.api_key`, falling back to the
/// `OPENAI_API_KEY` environment variable.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    dims: usize,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig, dims: usize) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                RagError::Config(
                    "embedding.api_key or OPENAI_API_KEY required for openai provider".to_string(),
                )
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            dims,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        // Only the v3 models accept a requested output size.
        if self.model.starts_with("text-embedding-3") {
            body["dimensions"] = serde_json::json!(self.dims);
        }

        let response = self
            .client
            .post(format!("{}/embeddings", self.url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::upstream(format!("embedding request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(RagError::upstream(format!(
                "embedding API error {}: {}",
                status, body_text
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| RagError::upstream(format!("embedding response read failed: {}", e)))?;
        parse_embeddings(&text, texts.len(), self.dims)
    }
}

/// Parse `data[].embedding`, restoring input order by `index`.
fn parse_embeddings(body: &str, expected: usize, dims: usize) -> Result<Vec<Vec<f32>>> {
    let mut parsed: EmbeddingsResponse = serde_json::from_str(body)?;
    if parsed.data.len() != expected {
        return Err(RagError::response_format(format!(
            "expected {} embeddings, got {}",
            expected,
            parsed.data.len()
        )));
    }
    parsed.data.sort_by_key(|item| item.index);

    parsed
        .data
        .into_iter()
        .map(|item| {
            if item.embedding.len() == dims {
                Ok(item.embedding)
            } else {
                Err(RagError::response_format(format!(
                    "embedding has {} dims, expected {}",
                    item.embedding.len(),
                    dims
                )))
            }
        })
        .collect()
}

// ============ Local Provider (fastembed) ============

/// In-process embedder using fastembed.
///
/// The model is loaded once (downloading it from Hugging Face on first use)
/// and reused for every call.
#[cfg(feature = "local-embeddings-fastembed")]
pub struct LocalEmbedder {
    model_name: String,
    dims: usize,
    batch_size: usize,
    model: Arc<std::sync::Mutex<fastembed::TextEmbedding>>,
}

#[cfg(feature = "local-embeddings-fastembed")]
impl LocalEmbedder {
    pub async fn load(config: &EmbeddingConfig, dims: usize) -> Result<Self> {
        let model_name = config
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_string());

        let native_dims = local_model_dims(&model_name);
        if native_dims != dims {
            return Err(RagError::Config(format!(
                "local model '{}' produces {} dims but the collection expects {}",
                model_name, native_dims, dims
            )));
        }

        let fastembed_model = config_to_fastembed_model(&model_name)?;
        let model = tokio::task::spawn_blocking(move || {
            fastembed::TextEmbedding::try_new(
                fastembed::InitOptions::new(fastembed_model).with_show_download_progress(true),
            )
        })
        .await
        .map_err(|e| RagError::Config(format!("embedding model loader crashed: {}", e)))?
        .map_err(|e| {
            RagError::Config(format!("Failed to initialize local embedding model: {}", e))
        })?;

        tracing::info!(model = %model_name, dims, "local embedding model ready");

        Ok(Self {
            model_name,
            dims,
            batch_size: config.batch_size,
            model: Arc::new(std::sync::Mutex::new(model)),
        })
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
#[async_trait]
impl Embedder for LocalEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();
        let batch_size = self.batch_size;

        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| RagError::upstream("local embedding model lock poisoned"))?;
            model
                .embed(texts, Some(batch_size))
                .map_err(|e| RagError::upstream(format!("Local embedding failed: {}", e)))
        })
        .await
        .map_err(|e| RagError::upstream(format!("local embedding task failed: {}", e)))?
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
fn config_to_fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
        "multilingual-e5-small" => Ok(fastembed::EmbeddingModel::MultilingualE5Small),
        other => Err(RagError::Config(format!(
            "Unknown local embedding model: '{}'. Supported models: \
             all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5, \
             multilingual-e5-small",
            other
        ))),
    }
}

/// Output size of the supported local models.
pub fn local_model_dims(name: &str) -> usize {
    match name {
        "bge-base-en-v1.5" => 768,
        "bge-large-en-v1.5" => 1024,
        _ => 384,
    }
}
