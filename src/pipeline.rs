//! The [`Pipeline`] context shared by ingestion and query.
//!
//! A pipeline owns every collaborator explicitly: the vector index, the
//! single embedder used for both documents and questions, the completion
//! model, the splitter and the fetcher. Nothing is global, so tests build
//! as many independent pipelines as they need.
//!
//! The operations themselves live in [`crate::ingest`] and [`crate::query`].

use std::sync::Arc;
use std::time::Duration;

use pdf_rag_core::chunk::RecursiveSplitter;
use pdf_rag_core::embedding::Embedder;
use pdf_rag_core::store::VectorIndex;
use pdf_rag_core::{RagError, Result};

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::fetch::PdfFetcher;
use crate::llm::{ChatCompletionClient, CompletionModel};
use crate::qdrant::QdrantIndex;

/// Tunables of a pipeline, normally taken from [`Config`].
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub top_k: usize,
    pub max_bytes: u64,
    pub fetch_timeout: Duration,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub min_output_tokens: u32,
    pub max_output_tokens: u32,
    pub default_output_tokens: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            top_k: config.retrieval.top_k,
            max_bytes: config.ingest.max_bytes,
            fetch_timeout: Duration::from_secs(config.ingest.fetch_timeout_secs),
            chunk_size: config.chunking.chunk_size,
            chunk_overlap: config.chunking.chunk_overlap,
            min_output_tokens: config.completion.min_output_tokens,
            max_output_tokens: config.completion.max_output_tokens,
            default_output_tokens: config.completion.default_output_tokens,
        }
    }
}

pub struct Pipeline {
    pub(crate) index: Arc<dyn VectorIndex>,
    pub(crate) embedder: Arc<dyn Embedder>,
    pub(crate) completion: Arc<dyn CompletionModel>,
    pub(crate) splitter: RecursiveSplitter,
    pub(crate) fetcher: PdfFetcher,
    pub(crate) settings: PipelineSettings,
}

impl Pipeline {
    /// Assemble a pipeline from explicit collaborators.
    ///
    /// Fails with [`RagError::Config`] when the embedder's output size does
    /// not match the collection, or the settings are out of range.
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        completion: Arc<dyn CompletionModel>,
        settings: PipelineSettings,
    ) -> Result<Self> {
        let spec = index.spec();
        if embedder.dims() != spec.dims {
            return Err(RagError::Config(format!(
                "embedder '{}' produces {} dims but collection '{}' expects {}",
                embedder.model_name(),
                embedder.dims(),
                spec.name,
                spec.dims
            )));
        }
        if settings.top_k == 0 {
            return Err(RagError::Config("top_k must be >= 1".to_string()));
        }
        if settings.min_output_tokens > settings.max_output_tokens {
            return Err(RagError::Config(format!(
                "output token range {}..={} is empty",
                settings.min_output_tokens, settings.max_output_tokens
            )));
        }

        let splitter = RecursiveSplitter::new(settings.chunk_size, settings.chunk_overlap)?;
        let fetcher = PdfFetcher::new(settings.fetch_timeout, settings.max_bytes)?;

        Ok(Self {
            index,
            embedder,
            completion,
            splitter,
            fetcher,
            settings,
        })
    }

    /// Build the production pipeline: Qdrant, the configured embedder and
    /// the hosted chat model.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let index = Arc::new(QdrantIndex::new(&config.vector_store)?);
        let embedder = create_embedder(&config.embedding, config.vector_store.dims).await?;
        let completion = Arc::new(ChatCompletionClient::new(&config.completion)?);

        tracing::debug!(
            collection = %config.vector_store.collection,
            embedder = embedder.model_name(),
            model = %config.completion.model,
            "pipeline assembled"
        );

        Self::new(
            index,
            embedder,
            completion,
            PipelineSettings::from_config(config),
        )
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Create the collection if it does not exist yet.
    pub async fn ensure_collection(&self) -> Result<()> {
        self.index.ensure_collection().await
    }

    /// Number of chunks currently stored.
    pub async fn count(&self) -> Result<usize> {
        self.index.count().await
    }
}
