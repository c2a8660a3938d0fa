//! Error types for the course tree.

use thiserror::Error;

/// Errors surfaced by the course tree, its caches and the remote collaborators.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport or HTTP-status failure talking to the course API
    #[error("Remote call '{operation}' failed: {message}")]
    Remote { operation: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    /// Payload could not be decoded into the expected model
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Waiting on another caller's in-flight load for this page timed out
    #[error("Page {page_index} unavailable: in-flight load did not finish in time")]
    PageUnavailable { page_index: usize },

    #[error("Cannot drop onto this item: {0}")]
    UnsupportedDropTarget(String),

    #[error("Invalid node for this operation: {0}")]
    InvalidNode(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),
}

impl ApiError {
    pub fn remote(operation: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Remote {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Transport-level failures that a later access may succeed on.
    ///
    /// Used for log classification only; nothing in this crate retries on its own.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ApiError::Remote { .. } | ApiError::PageUnavailable { .. }
        )
    }

    /// Single line shown to the user at the UI boundary.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Remote { operation, message } => {
                format!("Could not reach the course server ({}): {}", operation, message)
            }
            ApiError::UnsupportedDropTarget(reason) => reason.clone(),
            ApiError::Cancelled(_) => "The operation was cancelled.".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        let operation = err
            .url()
            .map(|u| u.path().to_string())
            .unwrap_or_else(|| "request".to_string());
        if err.is_decode() {
            return ApiError::Decode(err.to_string());
        }
        ApiError::Remote {
            operation,
            message: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}
