//! Transport error type for backend calls and its coarse classification.

use thiserror::Error;

/// Failure talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, timeout, or body decoding failure inside reqwest
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-2xx status
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Base URL cannot carry path segments (e.g. `mailto:`)
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Classify the error for log fields.
    ///
    /// Returns one of: "network", "server", "not_found", "decode", "config".
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Http(e) if e.is_decode() => "decode",
            ApiError::Http(_) => "network",
            ApiError::Server { status: 404, .. } => "not_found",
            ApiError::Server { .. } => "server",
            ApiError::InvalidBaseUrl(_) | ApiError::Url(_) => "config",
        }
    }
}
