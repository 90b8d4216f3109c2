//! Error types for memory operations.

use uuid::Uuid;

/// Errors returned by the memory store and its backends.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// Caller supplied an invalid argument.
    #[error("invalid memory input: {0}")]
    Validation(String),
    /// Referenced record does not exist.
    #[error("memory not found: {0}")]
    NotFound(Uuid),
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Embedding provider failed or returned a malformed vector.
    #[error("embedding error: {0}")]
    Embedding(String),
}

impl MemoryError {
    /// Whether the failure came from the persistence layer.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Serde(_))
    }
}
