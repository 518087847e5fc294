//! Shared fixtures: hand-built PDFs, a deterministic embedder and a
//! scripted completion model.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use pdf_rag::llm::CompletionModel;
use pdf_rag::pipeline::{Pipeline, PipelineSettings};
use pdf_rag_core::embedding::Embedder;
use pdf_rag_core::store::memory::InMemoryIndex;
use pdf_rag_core::store::{CollectionSpec, DEFAULT_DIMS};
use pdf_rag_core::{RagError, Result};

/// Minimal valid PDF with one Helvetica text line per page.
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let page_count = pages.len();
    let font_id = 3 + 2 * page_count;
    let mut offsets = Vec::new();
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");

    offsets.push(out.len());
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");

    let kids: Vec<String> = (0..page_count)
        .map(|i| format!("{} 0 R", 3 + 2 * i))
        .collect();
    offsets.push(out.len());
    out.extend_from_slice(
        format!(
            "2 0 obj << /Type /Pages /Kids [{}] /Count {} >> endobj\n",
            kids.join(" "),
            page_count
        )
        .as_bytes(),
    );

    for (i, text) in pages.iter().enumerate() {
        let page_id = 3 + 2 * i;
        let content_id = page_id + 1;
        offsets.push(out.len());
        out.extend_from_slice(
            format!(
                "{} 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {} 0 R /Resources << /Font << /F1 {} 0 R >> >> >> endobj\n",
                page_id, content_id, font_id
            )
            .as_bytes(),
        );

        let stream = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", text);
        offsets.push(out.len());
        out.extend_from_slice(
            format!(
                "{} 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
                content_id,
                stream.len(),
                stream
            )
            .as_bytes(),
        );
    }

    offsets.push(out.len());
    out.extend_from_slice(
        format!(
            "{} 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
            font_id
        )
        .as_bytes(),
    );

    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", offsets.len() + 1).as_bytes());
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in &offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer << /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            offsets.len() + 1,
            xref_start
        )
        .as_bytes(),
    );
    out
}

/// Hashes lowercase words into buckets, so texts sharing words are similar.
pub struct WordHashEmbedder {
    pub dims: usize,
}

impl WordHashEmbedder {
    fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let bucket = word
                .to_lowercase()
                .bytes()
                .fold(7usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize))
                % self.dims;
            v[bucket] += 1.0;
        }
        v
    }
}

#[async_trait]
impl Embedder for WordHashEmbedder {
    fn model_name(&self) -> &str {
        "word-hash"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}

/// Returns a fixed reply and records every prompt it receives.
pub struct ScriptedModel {
    pub reply: String,
    pub calls: Mutex<Vec<(String, u32)>>,
}

impl ScriptedModel {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), max_tokens));
        Ok(self.reply.clone())
    }
}

/// Always fails with the error built by the wrapped function.
pub struct FailingModel(pub fn() -> RagError);

#[async_trait]
impl CompletionModel for FailingModel {
    async fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<String> {
        Err((self.0)())
    }
}

/// Returns one vector fewer than it was asked for.
pub struct ShortEmbedder {
    pub dims: usize,
}

#[async_trait]
impl Embedder for ShortEmbedder {
    fn model_name(&self) -> &str {
        "short"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .skip(1)
            .map(|_| vec![1.0; self.dims])
            .collect())
    }
}

pub struct Harness {
    pub pipeline: Pipeline,
    pub index: Arc<InMemoryIndex>,
    pub model: Arc<ScriptedModel>,
}

pub fn harness() -> Harness {
    harness_with(PipelineSettings::default())
}

pub fn harness_with(settings: PipelineSettings) -> Harness {
    let model = Arc::new(ScriptedModel::new("It says Alpha."));
    let (pipeline, index) = pipeline_with(
        Arc::new(WordHashEmbedder { dims: DEFAULT_DIMS }),
        model.clone(),
        settings,
    );

    Harness {
        pipeline,
        index,
        model,
    }
}

/// Pipeline over a fresh in-memory index with the given collaborators.
pub fn pipeline_with(
    embedder: Arc<dyn Embedder>,
    model: Arc<dyn CompletionModel>,
    settings: PipelineSettings,
) -> (Pipeline, Arc<InMemoryIndex>) {
    let index = Arc::new(InMemoryIndex::new(CollectionSpec::new(
        "test_pdfs",
        DEFAULT_DIMS,
    )));
    let pipeline = Pipeline::new(index.clone(), embedder, model, settings)
        .unwrap_or_else(|e| panic!("pipeline: {}", e));
    (pipeline, index)
}
