//! CLI command implementations.

pub mod clear;
pub mod enqueue;
pub mod list;
pub mod remove;
pub mod stats;

use std::path::Path;
use std::sync::Arc;
use syncq_engine::{AlwaysOnline, BackendStore, SyncConfig, SyncEngine};
use syncq_storage::{FileBackend, StorageError};
use thiserror::Error;
use tracing::debug;

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// The queue directory does not exist.
    #[error("no queue directory at {0}")]
    MissingQueue(String),

    /// The storage layer failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A payload could not be parsed or output could not be encoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No pending item has the given id.
    #[error("no pending item with id {0:?}")]
    NotFound(String),
}

/// An engine over a queue directory. Never started by the CLI.
pub type QueueEngine = SyncEngine<BackendStore<FileBackend>, AlwaysOnline>;

/// Opens the queue stored under `key` in `path`.
///
/// With `create` unset the directory must already exist.
pub fn open_queue(path: &Path, key: &str, create: bool) -> CliResult<QueueEngine> {
    if !create && !path.is_dir() {
        return Err(CliError::MissingQueue(path.display().to_string()));
    }
    syncq_storage::validate_key(key)?;

    debug!("Opening queue {:?} in {}", key, path.display());
    let backend = Arc::new(FileBackend::open(path)?);
    let config = SyncConfig::default()
        .with_storage_key(key)
        .with_sync_on_enqueue(false);
    Ok(SyncEngine::with_backend(config, backend, AlwaysOnline))
}

/// Formats a millisecond age for humans.
pub fn format_age(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else if ms < 3_600_000 {
        format!("{:.1}m", ms as f64 / 60_000.0)
    } else {
        format!("{:.1}h", ms as f64 / 3_600_000.0)
    }
}
