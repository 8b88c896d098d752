//! Session error types

use thiserror::Error;

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that can occur during session operations
#[derive(Debug, Error)]
pub enum SessionError {
    /// No secret has been configured, so nothing can be encoded or decoded
    #[error("Session manager is not configured: a secret is required")]
    NotConfigured,

    /// Ciphertext was malformed or failed authentication
    #[error("Failed to decode session: {0}")]
    Decode(String),

    /// Error from the session store
    #[error("Session store error: {0}")]
    Store(String),

    /// Filesystem error from a file-backed store
    #[error("Session store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error during serialization/deserialization
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid session ID format
    #[error("Invalid session ID: {0}")]
    InvalidSessionId(String),
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Serialization(err.to_string())
    }
}
