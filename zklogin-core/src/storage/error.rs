//! Error types for session storage components.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by session storage primitives.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Errors coming from the underlying session store.
    #[error("session store error: {0}")]
    SessionStore(String),

    /// Serialization/deserialization failures.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A record violates a store invariant and was not written.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}
