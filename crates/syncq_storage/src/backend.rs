//! Storage backend trait definition.

use crate::error::{StorageError, StorageResult};

/// A key/value storage backend for SyncQ.
///
/// Storage backends are **opaque byte stores**. The engine writes one
/// serialized queue snapshot per key and reads it back at startup.
///
/// # Invariants
///
/// - `put` replaces the full value; a reader never observes a partial write
/// - `get` returns exactly the bytes of the last successful `put`
/// - After `put` returns `Ok`, the value survives process termination
///   (for durable backends)
/// - Backends must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For persistent storage
pub trait StorageBackend: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// Returns `Ok(None)` if nothing has been stored under the key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or an I/O error occurs.
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Replaces the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the write fails.
    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Deletes the value stored under `key`.
    ///
    /// Returns true if a value existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the delete fails.
    fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Lists all keys currently holding a value, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    fn keys(&self) -> StorageResult<Vec<String>>;
}

/// Validates a storage key.
///
/// Keys must be non-empty and consist of ASCII letters, digits, `_` or `-`,
/// so that every backend can map them to a file name.
///
/// # Errors
///
/// Returns [`StorageError::InvalidKey`] if the key is rejected.
pub fn validate_key(key: &str) -> StorageResult<()> {
    let valid = !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_keys() {
        assert!(validate_key("sync_queue").is_ok());
        assert!(validate_key("queue-2").is_ok());
    }

    #[test]
    fn rejects_path_like_keys() {
        assert!(validate_key("").is_err());
        assert!(validate_key("../etc").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key("with space").is_err());
    }
}
