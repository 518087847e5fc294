//! Core data models flowing through ingestion and retrieval.

use serde::{Deserialize, Serialize};

/// Text extracted from one PDF page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// 1-based page number.
    pub page: u32,
    pub text: String,
}

/// A bounded slice of document text with its provenance.
///
/// Created by the splitter during ingestion and never mutated afterwards.
/// The payload fields are what gets stored next to the vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Point id in the vector store (UUID v4).
    pub id: String,
    pub text: String,
    pub source_file: String,
    /// 1-based page the text came from.
    pub page: u32,
    /// Position within the document, contiguous from 0 across all pages.
    pub chunk_index: usize,
}

impl DocumentChunk {
    pub fn citation(&self) -> Citation {
        Citation {
            source_file: self.source_file.clone(),
            page: self.page,
        }
    }
}

/// A chunk paired with its embedding, ready to be written.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub chunk: DocumentChunk,
    pub vector: Vec<f32>,
}

/// A search hit: stored chunk plus similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// `(filename, page)` provenance of one retrieved chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    pub source_file: String,
    pub page: u32,
}

impl std::fmt::Display for Citation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (Page {})", self.source_file, self.page)
    }
}

/// Result of one question: generated text and the sources it was given.
///
/// `citations` is in retrieval-rank order, one entry per chunk placed in
/// the prompt context.
#[derive(Debug, Clone, Serialize)]
pub struct QueryAnswer {
    pub answer: String,
    pub citations: Vec<Citation>,
}
