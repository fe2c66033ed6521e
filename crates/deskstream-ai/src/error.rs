//! Error types for the streaming engine

use thiserror::Error;

/// Streaming engine error types
#[derive(Error, Debug)]
pub enum ChatError {
    /// Non-success status reported by the hosted application service.
    #[error("Error: {code} - {message}")]
    Vendor { code: String, message: String },

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for streaming operations
pub type Result<T> = std::result::Result<T, ChatError>;
