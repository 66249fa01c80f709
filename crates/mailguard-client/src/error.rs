//! Error types for the MailGuard client.

use std::time::Duration;

use thiserror::Error;

/// Errors from REST calls, push channels and local persistence.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error while reading or writing local files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP error! status: {status}")]
    Status {
        /// Status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The server answered with something other than JSON.
    #[error("Invalid response: expected JSON, got {0}")]
    InvalidContentType(String),

    /// JSON decoding error.
    #[error("JSON error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The server reported an error in its response body.
    #[error("{0}")]
    Server(String),

    /// Input rejected before any request was made.
    #[error("{0}")]
    Validation(String),

    /// URL parsing or joining error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Push-channel protocol violation.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Operation timed out.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error from the core model.
    #[error(transparent)]
    Core(#[from] mailguard_core::Error),
}

impl Error {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Io(_) | Self::Http(_) | Self::WebSocket(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        let err = Error::Status {
            status: 503,
            body: "down".into(),
        };
        assert_eq!(err.to_string(), "HTTP error! status: 503");
        assert!(err.is_transient());
    }

    #[test]
    fn test_validation_is_not_transient() {
        let err = Error::Validation("Please enter a recipient email address".into());
        assert!(!err.is_transient());
        assert_eq!(err.to_string(), "Please enter a recipient email address");
    }
}
