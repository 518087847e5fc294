//! Error type shared by every pipeline boundary.
//!
//! Each variant is a failure the presentation layer renders to the user.
//! None of them is retried automatically: the action that produced it has
//! to be triggered again.

use thiserror::Error;

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Debug, Error)]
pub enum RagError {
    /// Upload or download is larger than the configured cap.
    #[error("document is {size} bytes, exceeding the {limit} byte limit")]
    SizeLimitExceeded { size: u64, limit: u64 },

    /// Bytes could not be parsed as a PDF.
    #[error("not a readable PDF: {0}")]
    DocumentFormat(String),

    /// Retrieving a remote PDF failed (status, connection, or timeout).
    #[error("failed to fetch document: {0}")]
    Fetch(String),

    /// Vector store, embedding service, or completion API failed.
    #[error("upstream service error: {0}")]
    Upstream(String),

    /// An upstream service answered with a body we could not interpret.
    #[error("unexpected response format: {0}")]
    ResponseFormat(String),

    /// Caller-supplied arguments are out of range or empty.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Collaborators are configured inconsistently.
    #[error("configuration error: {0}")]
    Config(String),
}

impl RagError {
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    pub fn response_format(message: impl Into<String>) -> Self {
        Self::ResponseFormat(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Short machine-readable code, used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            RagError::SizeLimitExceeded { .. } => "size_limit_exceeded",
            RagError::DocumentFormat(_) => "document_format",
            RagError::Fetch(_) => "fetch_failed",
            RagError::Upstream(_) => "upstream",
            RagError::ResponseFormat(_) => "response_format",
            RagError::InvalidInput(_) => "bad_request",
            RagError::Config(_) => "config",
        }
    }
}

impl From<serde_json::Error> for RagError {
    fn from(err: serde_json::Error) -> Self {
        RagError::ResponseFormat(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_limit_message_names_both_sizes() {
        let err = RagError::SizeLimitExceeded {
            size: 11_534_336,
            limit: 10_485_760,
        };
        let msg = err.to_string();
        assert!(msg.contains("11534336"));
        assert!(msg.contains("10485760"));
        assert_eq!(err.code(), "size_limit_exceeded");
    }

    #[test]
    fn test_json_error_maps_to_response_format() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: RagError = json_err.into();
        assert!(matches!(err, RagError::ResponseFormat(_)));
    }
}
