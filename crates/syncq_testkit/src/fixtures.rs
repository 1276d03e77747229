//! Engine fixtures and store helpers.
//!
//! Provides convenience functions for setting up engines over in-memory or
//! temporary file stores, with a manual clock and network monitor so tests
//! control time and connectivity.

use std::sync::Arc;
use std::time::Duration;
use syncq_engine::{BackendStore, Clock, ManualClock, ManualNetworkMonitor, SyncConfig, SyncEngine};
use syncq_storage::{FileBackend, InMemoryBackend};
use tempfile::TempDir;

/// Start time of fixture clocks, epoch milliseconds.
pub const FIXTURE_EPOCH_MS: u64 = 1_700_000_000_000;

/// Engine type used by in-memory fixtures.
pub type MemoryEngine = SyncEngine<BackendStore<InMemoryBackend>, Arc<ManualNetworkMonitor>>;

/// An engine over an in-memory store with controllable time and network.
pub struct EngineFixture {
    /// The engine under test.
    pub engine: MemoryEngine,
    /// Backing store, shared so tests can inspect it or restart over it.
    pub backend: Arc<InMemoryBackend>,
    /// Connectivity switch.
    pub network: Arc<ManualNetworkMonitor>,
    /// Time source.
    pub clock: Arc<ManualClock>,
}

impl EngineFixture {
    /// Creates a fixture with the given config and initial connectivity.
    pub fn new(config: SyncConfig, online: bool) -> Self {
        let backend = Arc::new(InMemoryBackend::new());
        let network = Arc::new(ManualNetworkMonitor::new(online));
        let clock = Arc::new(ManualClock::new(FIXTURE_EPOCH_MS));
        let engine = Self::build(config, &backend, &network, &clock);

        Self {
            engine,
            backend,
            network,
            clock,
        }
    }

    /// An online fixture with default config.
    pub fn online() -> Self {
        Self::new(SyncConfig::default(), true)
    }

    /// An offline fixture with default config.
    pub fn offline() -> Self {
        Self::new(SyncConfig::default(), false)
    }

    /// Simulates a process restart: a fresh engine over the same store,
    /// network and clock. Handlers must be registered again.
    pub fn restart(&self, config: SyncConfig) -> MemoryEngine {
        Self::build(config, &self.backend, &self.network, &self.clock)
    }

    /// Moves the fixture clock forward.
    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    fn build(
        config: SyncConfig,
        backend: &Arc<InMemoryBackend>,
        network: &Arc<ManualNetworkMonitor>,
        clock: &Arc<ManualClock>,
    ) -> MemoryEngine {
        let store = BackendStore::with_key(Arc::clone(backend), config.storage_key.clone());
        let clock: Arc<dyn Clock> = clock.clone();
        SyncEngine::with_clock(config, store, Arc::clone(network), clock)
    }
}

/// A temporary directory for file-backed stores.
pub struct TestStore {
    dir: TempDir,
}

impl TestStore {
    /// Creates a new empty temporary directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Opens a file backend in the directory.
    ///
    /// Only one backend may be open at a time; drop it before reopening.
    pub fn open(&self) -> Arc<FileBackend> {
        Arc::new(FileBackend::open(self.dir.path()).expect("Failed to open file backend"))
    }

    /// Returns the directory path.
    pub fn path(&self) -> &std::path::Path {
        self.dir.path()
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use syncq_engine::{Mutation, Priority};

    #[test]
    fn restart_sees_persisted_items() {
        let fixture = EngineFixture::offline();
        fixture
            .engine
            .enqueue(Mutation::Favorite(json!({"attractionId": "a1"})), Priority::High);

        let restarted = fixture.restart(SyncConfig::default());
        assert_eq!(restarted.stats().total_pending, 1);
    }

    #[test]
    fn file_store_reopens() {
        let store = TestStore::new();
        {
            let backend = store.open();
            let engine = SyncEngine::with_backend(
                SyncConfig::default(),
                backend,
                syncq_engine::AlwaysOnline,
            );
            engine.enqueue(Mutation::Review(json!({"text": "ok"})), Priority::Low);
        }

        let engine =
            SyncEngine::with_backend(SyncConfig::default(), store.open(), syncq_engine::AlwaysOnline);
        assert_eq!(engine.snapshot().len(), 1);
    }
}
