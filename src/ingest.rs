//! Ingestion pipeline: PDF bytes → pages → chunks → vectors → index.
//!
//! Every entry point enforces the size cap before anything is parsed, so a
//! rejected document writes nothing. All chunks of one document are
//! embedded in a single call and written in a single batch.
//!
//! There is no rollback: if the store fails midway through a batch the
//! points already accepted stay.

use std::path::Path;

use serde::Serialize;

use pdf_rag_core::chunk::chunk_pages;
use pdf_rag_core::models::IndexedChunk;
use pdf_rag_core::{RagError, Result};

use crate::extract::extract_pages_blocking;
use crate::pipeline::Pipeline;

/// Outcome of ingesting one named document.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub source_file: String,
    pub chunks: usize,
}

impl Pipeline {
    /// Ingest a PDF already in memory. Returns the number of chunks stored.
    pub async fn ingest(&self, bytes: Vec<u8>, source_name: &str) -> Result<usize> {
        let source_name = source_name.trim();
        if source_name.is_empty() {
            return Err(RagError::invalid_input("source name must not be empty"));
        }
        self.check_size(bytes.len() as u64)?;

        let pages = extract_pages_blocking(bytes).await?;
        let chunks = chunk_pages(&self.splitter, &pages, source_name);
        tracing::debug!(
            source = source_name,
            pages = pages.len(),
            chunks = chunks.len(),
            "split document"
        );

        if chunks.is_empty() {
            tracing::warn!(source = source_name, "no extractable text, nothing stored");
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(RagError::response_format(format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let indexed: Vec<IndexedChunk> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexedChunk { chunk, vector })
            .collect();

        self.index.ensure_collection().await?;
        self.index.add(&indexed).await?;

        tracing::info!(source = source_name, chunks = indexed.len(), "ingested document");
        Ok(indexed.len())
    }

    /// Ingest a local file, cited under its file name.
    pub async fn ingest_file(&self, path: &Path) -> Result<IngestReport> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| RagError::invalid_input(format!("{}: {}", path.display(), e)))?;
        if !metadata.is_file() {
            return Err(RagError::invalid_input(format!(
                "{} is not a file",
                path.display()
            )));
        }
        self.check_size(metadata.len())?;

        let source_file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                RagError::invalid_input(format!("{} has no file name", path.display()))
            })?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| RagError::invalid_input(format!("{}: {}", path.display(), e)))?;
        let chunks = self.ingest(bytes, &source_file).await?;

        Ok(IngestReport {
            source_file,
            chunks,
        })
    }

    /// Download a PDF (size-capped, with timeout) and ingest it under the
    /// last segment of the URL path.
    pub async fn ingest_url(&self, url: &str) -> Result<IngestReport> {
        let fetched = self.fetcher.fetch(url).await?;
        let chunks = self.ingest(fetched.bytes, &fetched.source_name).await?;

        Ok(IngestReport {
            source_file: fetched.source_name,
            chunks,
        })
    }

    fn check_size(&self, size: u64) -> Result<()> {
        let limit = self.settings.max_bytes;
        if size > limit {
            return Err(RagError::SizeLimitExceeded { size, limit });
        }
        Ok(())
    }
}
