//! In-memory [`VectorIndex`] implementation for tests and offline runs.
//!
//! Points live in a `Vec` behind `std::sync::RwLock`. Search is brute-force
//! cosine similarity over every stored vector.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::error::{RagError, Result};
use crate::models::{IndexedChunk, ScoredChunk};

use super::{check_dims, CollectionSpec, VectorIndex};

pub struct InMemoryIndex {
    spec: CollectionSpec,
    points: RwLock<Vec<IndexedChunk>>,
}

impl InMemoryIndex {
    pub fn new(spec: CollectionSpec) -> Self {
        Self {
            spec,
            points: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new(CollectionSpec::default())
    }
}

fn poisoned<T>(_: PoisonError<T>) -> RagError {
    RagError::upstream("in-memory index lock poisoned")
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    fn spec(&self) -> &CollectionSpec {
        &self.spec
    }

    async fn ensure_collection(&self) -> Result<()> {
        Ok(())
    }

    async fn add(&self, chunks: &[IndexedChunk]) -> Result<()> {
        check_dims(&self.spec, chunks)?;
        let mut points = self.points.write().map_err(poisoned)?;
        points.extend_from_slice(chunks);
        Ok(())
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let points = self.points.read().map_err(poisoned)?;
        let mut hits: Vec<ScoredChunk> = points
            .iter()
            .map(|p| ScoredChunk {
                chunk: p.chunk.clone(),
                score: cosine_similarity(query, &p.vector),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.points.read().map_err(poisoned)?.len())
    }
}
