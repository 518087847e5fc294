//! # PDF RAG
//!
//! Retrieval-augmented question answering over PDF documents.
//!
//! PDFs are split into overlapping chunks per page, embedded, and stored in a
//! Qdrant collection together with their file name and page number. A
//! question is embedded with the same model, the nearest chunks are placed
//! into a prompt, and a hosted chat model writes the answer. Every answer
//! comes with `(file, page)` citations for the chunks it was given.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────┐
//! │ file / URL  │──▶│ Extract+Split │──▶│  Qdrant  │
//! │ / upload    │   │   + Embed     │   │          │
//! └─────────────┘   └──────────────┘   └────┬─────┘
//!                                           │ top-k
//!                   ┌──────────────┐   ┌────▼─────┐
//!                   │  Chat model  │◀──│  Prompt  │
//!                   └──────┬───────┘   └──────────┘
//!                          ▼
//!                  answer + citations
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment overrides |
//! | [`extract`] | Per-page PDF text extraction |
//! | [`fetch`] | Size-capped PDF download |
//! | [`embedding`] | Local (fastembed) and OpenAI-compatible embedders |
//! | [`qdrant`] | Qdrant REST vector index |
//! | [`llm`] | Chat-completion client |
//! | [`pipeline`] | The `Pipeline` context object |
//! | [`ingest`] | Ingestion operations |
//! | [`query`] | Question answering |
//! | [`server`] | HTTP server |
//!
//! Chunking, prompt assembly, the shared models and the `VectorIndex` /
//! `Embedder` traits live in the [`pdf_rag_core`] crate, re-exported here.

pub use pdf_rag_core;

pub mod config;
pub mod embedding;
pub mod extract;
pub mod fetch;
pub mod ingest;
pub mod llm;
pub mod pipeline;
pub mod qdrant;
pub mod query;
pub mod server;
