//! The sync engine: pass execution, single-flight and lifecycle.

use crate::clock::{Clock, SystemClock};
use crate::config::SyncConfig;
use crate::dispatcher::{DispatchOutcome, Dispatcher, Handler};
use crate::error::{SyncError, SyncResult};
use crate::item::{Mutation, MutationKind, Priority, SyncQueueItem};
use crate::network::NetworkMonitor;
use crate::queue::{MutationQueue, QueueStats};
use crate::report::{
    EngineState, EngineStats, EvictionReason, ItemOutcome, ItemResult, PassReport, PassTrigger,
};
use crate::scheduler::{self, SchedulerHandle};
use crate::store::{BackendStore, QueueStore};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use syncq_storage::StorageBackend;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

/// Offline-first mutation sync engine.
///
/// Callers enqueue mutations at any time; the engine persists them and
/// delivers them through the registered [`Handler`]s whenever the
/// [`NetworkMonitor`] reports connectivity. Passes are triggered by enqueue,
/// by reconnect, by a periodic timer and on demand, and never overlap.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use syncq_engine::{
///     handler_fn, AlwaysOnline, BackendStore, Mutation, Priority, SyncConfig, SyncEngine,
///     MutationKind,
/// };
/// use syncq_storage::InMemoryBackend;
///
/// let store = BackendStore::new(Arc::new(InMemoryBackend::new()));
/// let engine = SyncEngine::new(SyncConfig::default(), store, AlwaysOnline);
/// engine.register_handler(MutationKind::Favorite, handler_fn(|_payload| Ok(())));
///
/// engine.enqueue(Mutation::Favorite(serde_json::json!({"attractionId": "a1"})), Priority::High);
/// let report = engine.sync_now().unwrap();
/// assert_eq!(report.delivered(), 1);
/// assert_eq!(engine.stats().total_pending, 0);
/// ```
pub struct SyncEngine<S: QueueStore + 'static, N: NetworkMonitor + 'static> {
    inner: Arc<EngineInner<S, N>>,
    scheduler: Mutex<Option<SchedulerHandle>>,
}

pub(crate) struct EngineInner<S: QueueStore, N: NetworkMonitor> {
    pub(crate) config: SyncConfig,
    pub(crate) network: N,
    queue: MutationQueue<S>,
    dispatcher: Dispatcher,
    clock: Arc<dyn Clock>,
    busy: AtomicBool,
    stats: RwLock<EngineStats>,
    reports: broadcast::Sender<PassReport>,
    triggers: Mutex<Option<mpsc::Sender<PassTrigger>>>,
}

/// Holds the single-flight flag for the duration of a pass.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S: QueueStore + 'static, N: NetworkMonitor + 'static> SyncEngine<S, N> {
    /// Creates an engine over `store`, loading any persisted items.
    pub fn new(config: SyncConfig, store: S, network: N) -> Self {
        Self::with_clock(config, store, network, Arc::new(SystemClock))
    }

    /// Creates an engine with a custom time source.
    pub fn with_clock(config: SyncConfig, store: S, network: N, clock: Arc<dyn Clock>) -> Self {
        let queue = MutationQueue::load(store);
        let (reports, _) = broadcast::channel(config.report_channel_capacity.max(1));
        info!("Sync engine loaded {} pending mutations", queue.len());

        Self {
            inner: Arc::new(EngineInner {
                config,
                network,
                queue,
                dispatcher: Dispatcher::new(),
                clock,
                busy: AtomicBool::new(false),
                stats: RwLock::new(EngineStats::default()),
                reports,
                triggers: Mutex::new(None),
            }),
            scheduler: Mutex::new(None),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// Registers the handler for `kind`, replacing any previous one.
    pub fn register_handler(&self, kind: MutationKind, handler: Arc<dyn Handler>) {
        debug!("Registered handler for {}", kind);
        self.inner.dispatcher.register(kind, handler);
    }

    /// Removes the handler for `kind`.
    ///
    /// Items of that kind are evicted by the next pass that reaches them.
    pub fn unregister_handler(&self, kind: MutationKind) -> bool {
        self.inner.dispatcher.unregister(kind)
    }

    /// Enqueues `mutation` under a freshly generated id and returns the id.
    ///
    /// Never blocks on the network and never fails: a store write failure is
    /// logged and the item lives on in memory.
    pub fn enqueue(&self, mutation: Mutation, priority: Priority) -> String {
        self.insert(mutation, priority, None, self.inner.clock.now_ms())
    }

    /// Enqueues `mutation` with an id of the form `{kind}_{subject}_{now}`.
    pub fn enqueue_keyed(&self, mutation: Mutation, priority: Priority, subject: &str) -> String {
        let now = self.inner.clock.now_ms();
        let id = SyncQueueItem::make_id(mutation.kind(), subject, now);
        self.insert(mutation, priority, Some(id), now)
    }

    /// Enqueues `mutation` under a caller-chosen id.
    ///
    /// If an item with the same id is already pending this is a no-op: the
    /// pending item keeps its payload, priority and attempt count.
    pub fn enqueue_with_id(
        &self,
        id: impl Into<String>,
        mutation: Mutation,
        priority: Priority,
    ) -> String {
        self.insert(mutation, priority, Some(id.into()), self.inner.clock.now_ms())
    }

    fn insert(
        &self,
        mutation: Mutation,
        priority: Priority,
        id: Option<String>,
        now: u64,
    ) -> String {
        let (id, inserted) = self.inner.queue.enqueue(mutation, priority, id, now);
        if inserted {
            debug!("Enqueued {} ({})", id, priority);
            if self.inner.config.sync_on_enqueue && self.inner.network.is_online() {
                self.inner.signal(PassTrigger::Enqueue);
            }
        }
        id
    }

    /// Removes a pending item. Returns true if it was pending.
    pub fn remove_item(&self, id: &str) -> bool {
        let removed = self.inner.queue.remove(id);
        if removed {
            info!("Removed queued mutation {}", id);
        }
        removed
    }

    /// Drops every pending item. Returns how many were dropped.
    pub fn clear_queue(&self) -> usize {
        let dropped = self.inner.queue.clear();
        if dropped == 0 {
            debug!("Cleared sync queue (already empty)");
        } else {
            warn!("Cleared sync queue ({} mutations dropped)", dropped);
        }
        dropped
    }

    /// Runs one pass on the calling thread.
    ///
    /// Returns `None` without doing anything if another pass is running.
    /// Handlers run synchronously, so call this from a blocking context.
    pub fn sync_now(&self) -> Option<PassReport> {
        self.inner.run_pass(PassTrigger::Manual)
    }

    /// Asks the background scheduler for a pass without waiting for it.
    ///
    /// Returns false if the engine is not started, or if the request was
    /// coalesced with a pass that is already running or pending.
    pub fn trigger_sync_now(&self) -> bool {
        self.inner.signal(PassTrigger::Manual)
    }

    /// Starts the background scheduler on the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRunning` if started twice, or `NoRuntime` when called
    /// outside a Tokio runtime.
    pub fn start(&self) -> SyncResult<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SyncError::NoRuntime(e.to_string()))?;

        let mut slot = self.scheduler.lock();
        if slot.is_some() {
            return Err(SyncError::AlreadyRunning);
        }

        let (tx, rx) = mpsc::channel(1);
        *self.inner.triggers.lock() = Some(tx);
        *slot = Some(scheduler::spawn(&runtime, Arc::clone(&self.inner), rx));

        info!(
            "Sync engine started (interval {:?}, max attempts {})",
            self.inner.config.sync_interval, self.inner.config.max_attempts
        );
        Ok(())
    }

    /// Stops the scheduler: cancels the timer, unsubscribes from the network
    /// monitor and waits for an in-flight pass to finish.
    ///
    /// # Errors
    ///
    /// Returns `NotRunning` if the engine was not started.
    pub async fn stop(&self) -> SyncResult<()> {
        let handle = self.scheduler.lock().take().ok_or(SyncError::NotRunning)?;
        self.inner.triggers.lock().take();
        handle.shutdown().await;
        info!("Sync engine stopped");
        Ok(())
    }

    /// Whether the background scheduler is running.
    pub fn is_running(&self) -> bool {
        self.scheduler.lock().is_some()
    }

    /// Whether a pass is currently running.
    pub fn state(&self) -> EngineState {
        if self.inner.busy.load(Ordering::Acquire) {
            EngineState::Syncing
        } else {
            EngineState::Idle
        }
    }

    /// Summarizes the pending queue.
    pub fn stats(&self) -> QueueStats {
        self.inner.queue.stats(self.inner.clock.now_ms())
    }

    /// Returns cumulative pass statistics.
    pub fn engine_stats(&self) -> EngineStats {
        self.inner.stats.read().clone()
    }

    /// Returns a copy of the pending items in insertion order.
    pub fn snapshot(&self) -> Vec<SyncQueueItem> {
        self.inner.queue.snapshot()
    }

    /// Returns a copy of the pending items in processing order.
    pub fn pending(&self) -> Vec<SyncQueueItem> {
        self.inner.queue.sorted_snapshot()
    }

    /// Subscribes to the report of every subsequent pass.
    pub fn subscribe(&self) -> broadcast::Receiver<PassReport> {
        self.inner.reports.subscribe()
    }
}

impl<B: StorageBackend + 'static, N: NetworkMonitor + 'static> SyncEngine<BackendStore<B>, N> {
    /// Creates an engine persisting to `backend` under `config.storage_key`.
    pub fn with_backend(config: SyncConfig, backend: Arc<B>, network: N) -> Self {
        let store = BackendStore::with_key(backend, config.storage_key.clone());
        Self::new(config, store, network)
    }
}

impl<S: QueueStore, N: NetworkMonitor> EngineInner<S, N> {
    /// Sends `trigger` to the scheduler. Returns false if it was dropped.
    fn signal(&self, trigger: PassTrigger) -> bool {
        if self.busy.load(Ordering::Acquire) {
            self.note_coalesced();
            debug!("Pass running; {:?} trigger coalesced", trigger);
            return false;
        }

        let triggers = self.triggers.lock();
        let Some(tx) = triggers.as_ref() else {
            return false;
        };
        match tx.try_send(trigger) {
            Ok(()) => true,
            Err(_) => {
                self.note_coalesced();
                debug!("Pass already pending; {:?} trigger coalesced", trigger);
                false
            }
        }
    }

    /// Counts a trigger dropped because a pass was running or pending.
    pub(crate) fn note_coalesced(&self) {
        self.stats.write().coalesced_triggers += 1;
    }

    /// Runs one pass unless another is in progress.
    pub(crate) fn run_pass(&self, trigger: PassTrigger) -> Option<PassReport> {
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            self.note_coalesced();
            debug!("Pass already running; {:?} pass skipped", trigger);
            return None;
        };

        let started = Instant::now();
        let started_at = self.clock.now_ms();
        let online = self.network.is_online();
        let mut results = Vec::new();

        if !online {
            debug!("Offline; {:?} pass skipped", trigger);
        } else if !self.queue.is_empty() {
            debug!("Starting {:?} pass over {} items", trigger, self.queue.len());
            for item in self.queue.sorted_snapshot() {
                // Removed by remove_item/clear_queue since the snapshot.
                if !self.queue.contains(&item.id) {
                    continue;
                }
                let outcome = self.process_item(&item);
                results.push(ItemResult {
                    id: item.id,
                    kind: item.mutation.kind(),
                    outcome,
                });
            }
            if let Err(e) = self.queue.persist() {
                warn!("Failed to persist queue after pass: {}", e);
            }
        }

        let report = PassReport {
            trigger,
            online,
            started_at,
            duration: started.elapsed(),
            results,
        };
        self.record(&report);
        // No subscribers is fine.
        let _ = self.reports.send(report.clone());
        Some(report)
    }

    fn process_item(&self, item: &SyncQueueItem) -> ItemOutcome {
        let max_attempts = self.config.max_attempts;

        if item.attempts >= max_attempts {
            self.queue.remove(&item.id);
            error!(
                "Evicting {} after {} attempts (budget {})",
                item.id, item.attempts, max_attempts
            );
            return ItemOutcome::Evicted {
                reason: EvictionReason::MaxAttempts,
                error: None,
            };
        }

        let now = self.clock.now_ms();
        if !self.config.backoff.is_eligible(item, now) {
            return ItemOutcome::Deferred {
                retry_in_ms: self.config.backoff.remaining_ms(item, now),
            };
        }

        match self.dispatcher.dispatch(item) {
            DispatchOutcome::Delivered => {
                self.queue.remove(&item.id);
                info!("Delivered {}", item.id);
                ItemOutcome::Delivered
            }
            DispatchOutcome::Unrouted => {
                self.queue.remove(&item.id);
                error!("No handler registered for {}; evicting {}", item.kind(), item.id);
                ItemOutcome::Evicted {
                    reason: EvictionReason::NoHandler,
                    error: None,
                }
            }
            DispatchOutcome::Failed(e) => {
                let message = e.to_string();
                let attempts = self
                    .queue
                    .record_attempt(&item.id, self.clock.now_ms())
                    .unwrap_or(item.attempts.saturating_add(1));

                if attempts >= max_attempts {
                    self.queue.remove(&item.id);
                    error!(
                        "Evicting {} after {} failed attempts: {}",
                        item.id, attempts, message
                    );
                    ItemOutcome::Evicted {
                        reason: EvictionReason::MaxAttempts,
                        error: Some(message),
                    }
                } else {
                    warn!(
                        "Delivery of {} failed (attempt {}/{}): {}",
                        item.id, attempts, max_attempts, message
                    );
                    ItemOutcome::Retrying {
                        attempts,
                        error: message,
                    }
                }
            }
        }
    }

    fn record(&self, report: &PassReport) {
        let mut stats = self.stats.write();
        stats.passes_completed += 1;
        stats.last_pass_at = Some(report.started_at);
        for result in &report.results {
            match &result.outcome {
                ItemOutcome::Delivered => stats.delivered += 1,
                ItemOutcome::Retrying { error, .. } => {
                    stats.retried += 1;
                    stats.last_error = Some(error.clone());
                }
                ItemOutcome::Evicted { error, .. } => {
                    stats.evicted += 1;
                    if let Some(error) = error {
                        stats.last_error = Some(error.clone());
                    }
                }
                ItemOutcome::Deferred { .. } => stats.deferred += 1,
            }
        }
    }
}
