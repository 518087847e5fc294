//! # PDF RAG Core
//!
//! Shared, I/O-free logic for the PDF question-answering pipeline: data
//! models, the recursive character splitter, the [`VectorIndex`](store::VectorIndex)
//! and [`Embedder`](embedding::Embedder) traits, prompt rendering, and the
//! error type every pipeline boundary returns.
//!
//! This crate contains no HTTP client, PDF parser, or runtime setup. The
//! `pdf-rag` application crate supplies concrete collaborators (Qdrant,
//! fastembed, the chat-completion client) and wires them together.

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod models;
pub mod prompt;
pub mod store;

pub use error::{RagError, Result};
