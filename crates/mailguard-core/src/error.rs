//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A push payload or record could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The user identity is empty or otherwise unusable.
    #[error("Invalid identity: {0:?}")]
    InvalidIdentity(String),

    /// A push payload was well-formed JSON but not a recognised event shape.
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    /// Input rejected before any request was made.
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
