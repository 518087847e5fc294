//! Recursive character text splitter.
//!
//! Splits page text into overlapping chunks of at most `chunk_size`
//! characters, preferring natural boundaries before falling back to hard
//! character cuts.
//!
//! # Algorithm
//!
//! 1. Pick the first separator from `["\n\n", "\n", " ", ""]` that occurs in
//!    the text (`""` always matches and means "split into characters").
//! 2. Split on it, keeping the separator at the start of the following piece.
//! 3. Pieces shorter than `chunk_size` are accumulated and merged greedily;
//!    when the next piece would overflow, the buffer is emitted and pieces
//!    are dropped from its front until at most `chunk_overlap` characters
//!    remain, which then open the next chunk.
//! 4. Pieces that are themselves too long are split recursively with the
//!    remaining, finer separators.
//!
//! Lengths are counted in characters, not bytes. Every emitted chunk is
//! whitespace-trimmed; whitespace-only chunks are dropped. Because the last
//! separator splits into single characters, no chunk ever exceeds
//! `chunk_size` (for `chunk_size >= 1`).
//!
//! # Example
//!
//! ```rust
//! use pdf_rag_core::chunk::RecursiveSplitter;
//!
//! let splitter = RecursiveSplitter::new(384, 50).unwrap();
//! let chunks = splitter.split_text("Hello world.\n\nSecond paragraph.");
//! assert_eq!(chunks, vec!["Hello world.\n\nSecond paragraph.".to_string()]);
//! ```

use std::collections::VecDeque;

use uuid::Uuid;

use crate::error::{RagError, Result};
use crate::models::{DocumentChunk, PageText};

/// Separators tried in order, coarsest first.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Default maximum chunk length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 384;

/// Default overlap between consecutive chunks in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for RecursiveSplitter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl RecursiveSplitter {
    /// Build a splitter. `chunk_overlap` must be smaller than `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be > 0".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Split `text` into chunks. Empty or whitespace-only text yields none.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_with(text, &DEFAULT_SEPARATORS)
    }

    fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (separator, finer) = pick_separator(text, separators);
        let mut final_chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }

            if !pending.is_empty() {
                final_chunks.extend(self.merge_pieces(&pending));
                pending.clear();
            }

            if finer.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    final_chunks.push(trimmed.to_string());
                }
            } else {
                final_chunks.extend(self.split_with(piece, finer));
            }
        }

        if !pending.is_empty() {
            final_chunks.extend(self.merge_pieces(&pending));
        }

        final_chunks
    }

    /// Greedily merge small pieces into chunks, carrying up to
    /// `chunk_overlap` characters from the end of one chunk into the next.
    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size && !current.is_empty() {
                push_joined(&current, &mut chunks);

                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match current.pop_front() {
                        Some(dropped) => total -= char_len(dropped),
                        None => break,
                    }
                }
            }

            current.push_back(piece);
            total += len;
        }

        push_joined(&current, &mut chunks);
        chunks
    }
}

/// Split every page and attach provenance.
///
/// Pages are split independently so each chunk maps to exactly one page.
/// Chunk indices are contiguous from 0 across the whole document, and each
/// chunk gets a fresh UUID so re-ingesting a document appends new points.
pub fn chunk_pages(
    splitter: &RecursiveSplitter,
    pages: &[PageText],
    source_file: &str,
) -> Vec<DocumentChunk> {
    let mut chunks = Vec::new();

    for page in pages {
        for text in splitter.split_text(&page.text) {
            chunks.push(DocumentChunk {
                id: Uuid::new_v4().to_string(),
                text,
                source_file: source_file.to_string(),
                page: page.page,
                chunk_index: chunks.len(),
            });
        }
    }

    chunks
}

fn pick_separator<'s>(text: &str, separators: &'s [&'s str]) -> (&'s str, &'s [&'s str]) {
    for (i, &sep) in separators.iter().enumerate() {
        if sep.is_empty() {
            return (sep, &[]);
        }
        if text.contains(sep) {
            return (sep, &separators[i + 1..]);
        }
    }
    (separators.last().copied().unwrap_or(""), &[])
}

/// Split on `sep`, attaching each separator to the start of the piece after it.
fn split_keeping_separator<'t>(text: &'t str, sep: &str) -> Vec<&'t str> {
    if sep.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(sep) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn push_joined(pieces: &VecDeque<&str>, out: &mut Vec<String>) {
    let joined: String = pieces.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
