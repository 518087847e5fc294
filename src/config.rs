//! Configuration loading.
//!
//! Settings come from an optional TOML file (every field has a default) and
//! are then overridden by the environment:
//!
//! | Variable     | Field                   |
//! |--------------|-------------------------|
//! | `QDRANT_URI` | `vector_store.url`      |
//! | `QDRANT_API` | `vector_store.api_key`  |
//! | `OPENROUTER` | `completion.api_key`    |
//!
//! Unset credentials fall back to placeholder values so the binary starts
//! without any setup. A warning is logged for every placeholder still in
//! effect; requests made with them will be rejected upstream.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

use pdf_rag_core::chunk::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use pdf_rag_core::store::{DEFAULT_COLLECTION, DEFAULT_DIMS};

pub const ENV_QDRANT_URI: &str = "QDRANT_URI";
pub const ENV_QDRANT_API: &str = "QDRANT_API";
pub const ENV_OPENROUTER: &str = "OPENROUTER";

pub const PLACEHOLDER_QDRANT_URI: &str = "https://your-qdrant-host";
pub const PLACEHOLDER_QDRANT_API: &str = "your-qdrant-api-key";
pub const PLACEHOLDER_OPENROUTER: &str = "your-openrouter-api-key";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub vector_store: VectorStoreConfig,
    pub embedding: EmbeddingConfig,
    pub completion: CompletionConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub ingest: IngestConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct VectorStoreConfig {
    pub url: String,
    pub api_key: String,
    pub collection: String,
    pub dims: usize,
    pub timeout_secs: u64,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            url: PLACEHOLDER_QDRANT_URI.to_string(),
            api_key: PLACEHOLDER_QDRANT_API.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            dims: DEFAULT_DIMS,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `"local"` (fastembed) or `"openai"` (OpenAI-compatible HTTP).
    pub provider: String,
    pub model: Option<String>,
    /// Base URL for the `"openai"` provider.
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub batch_size: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "local".to_string(),
            model: None,
            url: None,
            api_key: None,
            batch_size: 64,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CompletionConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub timeout_secs: u64,
    pub min_output_tokens: u32,
    pub max_output_tokens: u32,
    pub default_output_tokens: u32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "deepseek/deepseek-chat:free".to_string(),
            api_key: PLACEHOLDER_OPENROUTER.to_string(),
            timeout_secs: 120,
            min_output_tokens: 512,
            max_output_tokens: 1024,
            default_output_tokens: 512,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IngestConfig {
    pub max_bytes: u64,
    pub fetch_timeout_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            fetch_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8501".to_string(),
        }
    }
}

/// Load configuration from `path` (if it exists) and the environment.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Config::default()
    };

    apply_env(&mut config, |key| std::env::var(key).ok());
    validate(&config)?;
    warn_placeholders(&config);

    Ok(config)
}

/// Override credentials from an environment lookup. Empty values are ignored.
pub fn apply_env<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = get(ENV_QDRANT_URI) {
        config.vector_store.url = url;
    }
    if let Some(key) = get(ENV_QDRANT_API) {
        config.vector_store.api_key = key;
    }
    if let Some(key) = get(ENV_OPENROUTER) {
        config.completion.api_key = key;
    }
}

pub fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        bail!("chunking.chunk_overlap must be smaller than chunking.chunk_size");
    }

    if config.retrieval.top_k < 1 {
        bail!("retrieval.top_k must be >= 1");
    }

    if config.vector_store.dims == 0 {
        bail!("vector_store.dims must be > 0");
    }
    if config.vector_store.collection.trim().is_empty() {
        bail!("vector_store.collection must not be empty");
    }

    if config.ingest.max_bytes == 0 {
        bail!("ingest.max_bytes must be > 0");
    }

    let c = &config.completion;
    if !(c.min_output_tokens <= c.default_output_tokens
        && c.default_output_tokens <= c.max_output_tokens)
    {
        bail!(
            "completion output tokens must satisfy min ({}) <= default ({}) <= max ({})",
            c.min_output_tokens,
            c.default_output_tokens,
            c.max_output_tokens
        );
    }

    match config.embedding.provider.as_str() {
        "local" | "openai" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be local or openai.",
            other
        ),
    }

    Ok(())
}

fn warn_placeholders(config: &Config) {
    if config.vector_store.url == PLACEHOLDER_QDRANT_URI {
        tracing::warn!("{} not set, using placeholder vector store URL", ENV_QDRANT_URI);
    }
    if config.vector_store.api_key == PLACEHOLDER_QDRANT_API {
        tracing::warn!("{} not set, using placeholder vector store key", ENV_QDRANT_API);
    }
    if config.completion.api_key == PLACEHOLDER_OPENROUTER {
        tracing::warn!("{} not set, using placeholder completion API key", ENV_OPENROUTER);
    }
}
