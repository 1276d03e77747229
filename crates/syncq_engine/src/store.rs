//! Persistence contract for the queue snapshot.

use crate::config::DEFAULT_STORAGE_KEY;
use crate::error::SyncResult;
use crate::item::SyncQueueItem;
use std::sync::Arc;
use syncq_storage::StorageBackend;

/// Durable home of the queue snapshot.
///
/// The engine saves the full item list after every mutation and loads it
/// once at construction. There is no schema migration: a snapshot that fails
/// to decode is treated as empty by the caller.
pub trait QueueStore: Send + Sync {
    /// Loads the persisted snapshot. A missing snapshot is `Ok(vec![])`.
    fn load(&self) -> SyncResult<Vec<SyncQueueItem>>;

    /// Replaces the persisted snapshot.
    fn save(&self, items: &[SyncQueueItem]) -> SyncResult<()>;
}

impl<T: QueueStore + ?Sized> QueueStore for Arc<T> {
    fn load(&self) -> SyncResult<Vec<SyncQueueItem>> {
        (**self).load()
    }

    fn save(&self, items: &[SyncQueueItem]) -> SyncResult<()> {
        (**self).save(items)
    }
}

/// A [`QueueStore`] that keeps the snapshot as a JSON array under one key of
/// a [`StorageBackend`].
pub struct BackendStore<B: StorageBackend> {
    backend: Arc<B>,
    key: String,
}

impl<B: StorageBackend> BackendStore<B> {
    /// Creates a store using the default key.
    pub fn new(backend: Arc<B>) -> Self {
        Self::with_key(backend, DEFAULT_STORAGE_KEY)
    }

    /// Creates a store using a custom key.
    pub fn with_key(backend: Arc<B>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Returns the storage key.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl<B: StorageBackend> QueueStore for BackendStore<B> {
    fn load(&self) -> SyncResult<Vec<SyncQueueItem>> {
        match self.backend.get(&self.key)? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, items: &[SyncQueueItem]) -> SyncResult<()> {
        let bytes = serde_json::to_vec(items)?;
        self.backend.put(&self.key, &bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::item::{Mutation, Priority};
    use serde_json::json;
    use syncq_storage::InMemoryBackend;

    fn item(id: &str) -> SyncQueueItem {
        SyncQueueItem::new(
            id.into(),
            Mutation::Rating(json!({"stars": 4})),
            Priority::Medium,
            7,
        )
    }

    #[test]
    fn missing_snapshot_is_empty() {
        let store = BackendStore::new(Arc::new(InMemoryBackend::new()));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = BackendStore::new(Arc::clone(&backend));

        store.save(&[item("a"), item("b")]).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, vec![item("a"), item("b")]);
        assert!(backend.get(DEFAULT_STORAGE_KEY).unwrap().is_some());
    }

    #[test]
    fn custom_key() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = BackendStore::with_key(Arc::clone(&backend), "outbox");
        store.save(&[item("a")]).unwrap();

        assert_eq!(store.key(), "outbox");
        assert!(backend.get("outbox").unwrap().is_some());
        assert!(backend.get(DEFAULT_STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn corrupt_snapshot_is_codec_error() {
        let backend = InMemoryBackend::with_value(DEFAULT_STORAGE_KEY, b"{not json".to_vec());
        let store = BackendStore::new(Arc::new(backend));
        assert!(matches!(store.load(), Err(SyncError::Codec(_))));
    }

    #[test]
    fn write_failure_is_storage_error() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.set_fail_writes(true);
        let store = BackendStore::new(backend);
        assert!(matches!(store.save(&[item("a")]), Err(SyncError::Storage(_))));
    }
}
