//! Storage error types

use thiserror::Error;

/// Failures of a key/value storage backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(String),

    #[error("storage contents are corrupt: {0}")]
    Corrupt(String),

    #[error("storage serialization error: {0}")]
    Serialization(String),

    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Storage result type
pub type StorageResult<T> = Result<T, StorageError>;
