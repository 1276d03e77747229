//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The key contains characters that cannot be mapped to storage.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    /// Another process holds the storage directory lock.
    #[error("storage directory is locked: {0}")]
    Locked(String),

    /// The backend refused the write.
    #[error("storage is read-only")]
    ReadOnly,
}
