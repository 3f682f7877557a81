//! Teleassist error types

use thiserror::Error;

/// Teleassist error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Channel error
    #[error("Channel error: {0}")]
    Channel(String),

    /// Upstream API answered with a non-success status
    #[error("{service} API error (status {status}): {body}")]
    Api {
        /// Which backend answered
        service: &'static str,
        /// HTTP status code
        status: u16,
        /// Response body, possibly truncated
        body: String,
    },

    /// Generative-AI error that is not an HTTP status
    #[error("AI error: {0}")]
    Ai(String),

    /// File type the processor cannot handle
    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),

    /// File processing error
    #[error("File error: {0}")]
    File(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Quiz error
    #[error("Quiz error: {0}")]
    Quiz(String),

    /// Gateway error
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<mongodb::error::Error> for Error {
    fn from(err: mongodb::error::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl Error {
    /// Build an `Api` error, clipping long response bodies
    pub fn api(service: &'static str, status: u16, body: impl Into<String>) -> Self {
        let mut body = body.into();
        if body.len() > 512 {
            let cut = (0..=512).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
            body.truncate(cut);
            body.push_str("...");
        }
        Error::Api {
            service,
            status,
            body,
        }
    }
}

/// Result type alias for Teleassist operations
pub type Result<T> = std::result::Result<T, Error>;
