//! In-memory storage backend for testing.

use crate::backend::{validate_key, StorageBackend};
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// An in-memory storage backend.
///
/// This backend keeps all values in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Queues that don't need to survive a restart
///
/// Sharing one instance between two engines (via `Arc`) simulates a process
/// restart over the same durable store.
///
/// # Example
///
/// ```rust
/// use syncq_storage::{StorageBackend, InMemoryBackend};
///
/// let backend = InMemoryBackend::new();
/// backend.put("k", b"v").unwrap();
/// assert_eq!(backend.keys().unwrap(), vec!["k".to_string()]);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: RwLock<BTreeMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
    writes: AtomicU64,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory backend holding one pre-existing value.
    ///
    /// Useful for testing recovery from corrupt snapshots.
    #[must_use]
    pub fn with_value(key: &str, value: Vec<u8>) -> Self {
        let backend = Self::default();
        backend.data.write().insert(key.to_string(), value);
        backend
    }

    /// Makes every subsequent `put` and `delete` fail with
    /// [`StorageError::ReadOnly`] until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes since creation.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StorageError::ReadOnly)
        } else {
            Ok(())
        }
    }
}

impl StorageBackend for InMemoryBackend {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_key(key)?;
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        validate_key(key)?;
        self.check_writable()?;
        self.data.write().insert(key.to_string(), value.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        self.check_writable()?;
        let existed = self.data.write().remove(key).is_some();
        if existed {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(existed)
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.data.read().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_put_and_get() {
        let backend = InMemoryBackend::new();
        assert_eq!(backend.get("a").unwrap(), None);

        backend.put("a", b"hello").unwrap();
        assert_eq!(backend.get("a").unwrap(), Some(b"hello".to_vec()));

        backend.put("a", b"world").unwrap();
        assert_eq!(backend.get("a").unwrap(), Some(b"world".to_vec()));
        assert_eq!(backend.write_count(), 2);
    }

    #[test]
    fn memory_delete() {
        let backend = InMemoryBackend::new();
        backend.put("a", b"x").unwrap();

        assert!(backend.delete("a").unwrap());
        assert!(!backend.delete("a").unwrap());
        assert_eq!(backend.get("a").unwrap(), None);
    }

    #[test]
    fn memory_keys_sorted() {
        let backend = InMemoryBackend::new();
        backend.put("b", b"2").unwrap();
        backend.put("a", b"1").unwrap();
        assert_eq!(backend.keys().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn memory_fail_writes() {
        let backend = InMemoryBackend::new();
        backend.put("a", b"before").unwrap();

        backend.set_fail_writes(true);
        assert!(matches!(backend.put("a", b"after"), Err(StorageError::ReadOnly)));
        assert!(matches!(backend.delete("a"), Err(StorageError::ReadOnly)));
        assert_eq!(backend.get("a").unwrap(), Some(b"before".to_vec()));

        backend.set_fail_writes(false);
        backend.put("a", b"after").unwrap();
        assert_eq!(backend.get("a").unwrap(), Some(b"after".to_vec()));
    }

    #[test]
    fn memory_with_value() {
        let backend = InMemoryBackend::with_value("q", b"{broken".to_vec());
        assert_eq!(backend.get("q").unwrap(), Some(b"{broken".to_vec()));
        assert_eq!(backend.write_count(), 0);
    }

    proptest::proptest! {
        #[test]
        fn memory_last_put_wins(values in proptest::collection::vec(
            proptest::collection::vec(proptest::prelude::any::<u8>(), 0..64),
            1..8,
        )) {
            let backend = InMemoryBackend::new();
            for value in &values {
                backend.put("k", value).unwrap();
            }
            proptest::prop_assert_eq!(backend.get("k").unwrap(), values.last().cloned());
        }
    }

    #[test]
    fn memory_rejects_invalid_key() {
        let backend = InMemoryBackend::new();
        assert!(matches!(
            backend.put("a/b", b"x"),
            Err(StorageError::InvalidKey(_))
        ));
    }
}
