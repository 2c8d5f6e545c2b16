//! Error types for frame-delivery

use thiserror::Error;

/// Delivery error
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Collection definition lookup returned nothing
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// An upstream collaborator answered with an `error` payload
    #[error("Upstream {service} error: {message}")]
    Upstream { service: &'static str, message: String },

    /// Base documents (entries, sections, items) could not be fetched
    #[error("Document fetch failed: {0}")]
    DocumentFetchFailed(String),

    /// Translation overlays could not be fetched (never surfaced to callers)
    #[error("Translation fetch failed: {0}")]
    TranslationFetchFailed(String),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Request was cancelled or ran past its deadline
    #[error("Request cancelled")]
    Cancelled,

    /// Caller supplied invalid parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Listener / socket failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeliveryError {
    /// Whether this error ends the whole request regardless of where it occurred
    pub fn is_cancellation(&self) -> bool {
        matches!(self, DeliveryError::Cancelled)
    }
}

/// Result type for delivery operations
pub type Result<T> = std::result::Result<T, DeliveryError>;
