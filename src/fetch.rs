//! Size-capped PDF download.
//!
//! The cap is enforced twice: a `Content-Length` above the limit is rejected
//! before the body is read, and the streamed body is abandoned as soon as
//! the received byte count passes the limit (servers may omit or understate
//! the header). Any transport failure, non-2xx status, or timeout is a
//! [`RagError::Fetch`]; nothing is returned for partial downloads.

use std::fmt::Display;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use reqwest::Url;

use pdf_rag_core::{RagError, Result};

use crate::extract::MIME_PDF;

/// Name used when the URL path has no usable last segment.
pub const FALLBACK_SOURCE_NAME: &str = "document.pdf";

/// A downloaded document and the name it will be cited under.
#[derive(Debug, Clone)]
pub struct FetchedPdf {
    pub source_name: String,
    pub bytes: Vec<u8>,
}

pub struct PdfFetcher {
    client: reqwest::Client,
    max_bytes: u64,
}

impl PdfFetcher {
    /// `timeout` bounds the whole request, body included.
    pub fn new(timeout: Duration, max_bytes: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, max_bytes })
    }

    pub async fn fetch(&self, url: &str) -> Result<FetchedPdf> {
        let parsed =
            Url::parse(url).map_err(|e| RagError::Fetch(format!("invalid URL '{}': {}", url, e)))?;

        if !parsed.path().to_lowercase().ends_with(".pdf") {
            tracing::warn!(%url, "URL may not point to a PDF");
        }

        let response = self
            .client
            .get(parsed.clone())
            .send()
            .await
            .map_err(|e| fetch_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RagError::Fetch(format!("{} returned HTTP {}", url, status)));
        }

        if let Some(content_type) = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !content_type.starts_with(MIME_PDF) {
                tracing::warn!(%url, content_type, "server did not label the body as a PDF");
            }
        }

        if let Some(len) = response.content_length() {
            if len > self.max_bytes {
                return Err(RagError::SizeLimitExceeded {
                    size: len,
                    limit: self.max_bytes,
                });
            }
        }

        let bytes = read_capped(response.bytes_stream(), self.max_bytes).await?;
        tracing::debug!(%url, bytes = bytes.len(), "downloaded document");

        Ok(FetchedPdf {
            source_name: source_name_from_url(&parsed),
            bytes,
        })
    }
}

fn fetch_error(url: &str, err: &reqwest::Error) -> RagError {
    if err.is_timeout() {
        RagError::Fetch(format!("timed out fetching {}", url))
    } else {
        RagError::Fetch(format!("{}: {}", url, err))
    }
}

/// Collect a byte stream, failing once more than `limit` bytes have arrived.
pub async fn read_capped<S, B, E>(stream: S, limit: u64) -> Result<Vec<u8>>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut stream = std::pin::pin!(stream);
    let mut out = Vec::new();
    while let Some(piece) = stream.next().await {
        let piece = piece.map_err(|e| RagError::Fetch(format!("error while reading body: {}", e)))?;
        out.extend_from_slice(piece.as_ref());
        if out.len() as u64 > limit {
            return Err(RagError::SizeLimitExceeded {
                size: out.len() as u64,
                limit,
            });
        }
    }
    Ok(out)
}

/// Last non-empty path segment, e.g. `https://x/y/report.pdf` → `report.pdf`.
pub fn source_name_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(str::to_string)
        .unwrap_or_else(|| FALLBACK_SOURCE_NAME.to_string())
}
