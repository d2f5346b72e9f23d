//! Error types for the farm backend client

use thiserror::Error;

/// Farm backend error
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server returned a non-success status
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Resource (or the whole endpoint) not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Server rejected the write because the tank is already claimed
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Response body could not be normalized into a record
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Call did not complete before the deadline
    #[error("{operation} timed out after {after_ms}ms")]
    Timeout { operation: &'static str, after_ms: u64 },

    /// Client could not be constructed
    #[error("Client configuration error: {0}")]
    Config(String),
}

impl BackendError {
    /// True when the endpoint or resource does not exist on the server.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::NotFound(_))
    }

    /// True when the server enforced tank exclusivity itself.
    pub fn is_conflict(&self) -> bool {
        matches!(self, BackendError::Conflict(_))
    }
}

/// Result type for backend operations
pub type Result<T> = std::result::Result<T, BackendError>;
