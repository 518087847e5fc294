//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait is the seam between the pipelines and the
//! vector store. The app crate provides a Qdrant implementation; this crate
//! provides [`memory::InMemoryIndex`] for tests and offline runs.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{IndexedChunk, ScoredChunk};

/// Default collection name shared by every ingested document.
pub const DEFAULT_COLLECTION: &str = "uploaded_pdfs_384";

/// Default embedding dimensionality of the collection.
pub const DEFAULT_DIMS: usize = 384;

/// Similarity metric of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Distance {
    #[default]
    Cosine,
}

impl Distance {
    /// Name used on the Qdrant wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Distance::Cosine => "Cosine",
        }
    }
}

/// Fixed shape of a collection: created once, never resized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    pub name: String,
    pub dims: usize,
    pub distance: Distance,
}

impl CollectionSpec {
    pub fn new(name: impl Into<String>, dims: usize) -> Self {
        Self {
            name: name.into(),
            dims,
            distance: Distance::Cosine,
        }
    }
}

impl Default for CollectionSpec {
    fn default() -> Self {
        Self::new(DEFAULT_COLLECTION, DEFAULT_DIMS)
    }
}

/// Abstract vector store.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`ensure_collection`](VectorIndex::ensure_collection) | Create the collection if absent (idempotent) |
/// | [`add`](VectorIndex::add) | Append points (no upsert, no delete) |
/// | [`search`](VectorIndex::search) | Top-k nearest points with payloads |
/// | [`count`](VectorIndex::count) | Number of stored points |
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Shape of the collection this index writes to.
    fn spec(&self) -> &CollectionSpec;

    /// Create the collection if it does not exist; no-op otherwise.
    async fn ensure_collection(&self) -> Result<()>;

    /// Append all chunks in one batch.
    async fn add(&self, chunks: &[IndexedChunk]) -> Result<()>;

    /// Return at most `k` hits ranked by non-increasing similarity.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>>;

    /// Number of points currently stored.
    async fn count(&self) -> Result<usize>;
}

/// Reject vectors whose length does not match the collection before any
/// write happens.
pub fn check_dims(spec: &CollectionSpec, chunks: &[IndexedChunk]) -> Result<()> {
    if let Some(bad) = chunks.iter().find(|c| c.vector.len() != spec.dims) {
        return Err(crate::error::RagError::invalid_input(format!(
            "vector for chunk {} has {} dims, collection '{}' expects {}",
            bad.chunk.chunk_index,
            bad.vector.len(),
            spec.name,
            spec.dims
        )));
    }
    Ok(())
}
