//! Error types for the sync engine.

use syncq_storage::StorageError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur inside the sync engine.
///
/// None of these escape `enqueue` or a sync pass; they are logged and turned
/// into per-item outcomes. Only lifecycle misuse is returned to callers.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A handler failed to deliver a mutation.
    #[error("delivery failed: {message}")]
    Delivery {
        /// Error message.
        message: String,
        /// Whether the delivery can be retried.
        retryable: bool,
    },

    /// A handler panicked while delivering.
    #[error("handler panicked: {0}")]
    HandlerPanicked(String),

    /// The persistent store failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The queue snapshot could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// `start` was called on a running engine.
    #[error("sync engine is already running")]
    AlreadyRunning,

    /// The operation requires a started engine.
    #[error("sync engine is not running")]
    NotRunning,

    /// `start` was called outside a Tokio runtime.
    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),
}

impl SyncError {
    /// Creates a retryable delivery error.
    pub fn delivery_retryable(message: impl Into<String>) -> Self {
        Self::Delivery {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable delivery error.
    ///
    /// The engine still retries it until the attempt budget runs out; the
    /// flag is informational for handlers and observers.
    pub fn delivery_fatal(message: impl Into<String>) -> Self {
        Self::Delivery {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Delivery { retryable, .. } => *retryable,
            SyncError::HandlerPanicked(_) => true,
            SyncError::Storage(_) => true,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Codec(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::delivery_retryable("connection lost").is_retryable());
        assert!(!SyncError::delivery_fatal("bad request").is_retryable());
        assert!(SyncError::HandlerPanicked("boom".into()).is_retryable());
        assert!(SyncError::Storage(StorageError::ReadOnly).is_retryable());
        assert!(!SyncError::AlreadyRunning.is_retryable());
    }

    #[test]
    fn error_display() {
        let err = SyncError::NotRunning;
        assert_eq!(err.to_string(), "sync engine is not running");

        let err = SyncError::delivery_retryable("503 from server");
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn json_errors_become_codec_errors() {
        let err: SyncError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, SyncError::Codec(_)));
    }
}
