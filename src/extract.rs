//! PDF text extraction.
//!
//! Returns one [`PageText`] per page with 1-based page numbers, so every
//! chunk split from a page can carry the page it came from.

use pdf_rag_core::models::PageText;
use pdf_rag_core::{RagError, Result};

pub const MIME_PDF: &str = "application/pdf";

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Extract text page by page. Fails with [`RagError::DocumentFormat`] when
/// the bytes are not a parseable PDF.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<PageText>> {
    if !looks_like_pdf(bytes) {
        return Err(RagError::DocumentFormat(
            "missing %PDF- header".to_string(),
        ));
    }

    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| RagError::DocumentFormat(e.to_string()))?;

    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(i, text)| PageText {
            page: i as u32 + 1,
            text,
        })
        .collect())
}

/// [`extract_pages`] on the blocking pool. A panic inside the parser
/// (malformed fonts are a known trigger) surfaces as a format error instead
/// of taking the caller down.
pub async fn extract_pages_blocking(bytes: Vec<u8>) -> Result<Vec<PageText>> {
    tokio::task::spawn_blocking(move || extract_pages(&bytes))
        .await
        .map_err(|e| RagError::DocumentFormat(format!("PDF parser crashed: {}", e)))?
}

/// PDF files may carry a few bytes of junk before the header; readers accept
/// the header anywhere in the first kilobyte.
fn looks_like_pdf(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    head.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC)
}
