//! In-memory mutation queue mirrored to a [`QueueStore`].

use crate::error::SyncResult;
use crate::item::{Mutation, Priority, SyncQueueItem};
use crate::store::QueueStore;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};
use uuid::Uuid;

/// Read-only summary of the pending queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    /// Number of pending items.
    pub total_pending: usize,
    /// Pending items per mutation kind name.
    pub by_kind: BTreeMap<String, usize>,
    /// Age of the oldest pending item; 0 when empty.
    pub oldest_item_age_ms: u64,
    /// Pending items with at least one failed attempt.
    pub items_with_failed_attempts: usize,
}

/// The authoritative list of pending items.
///
/// Every mutating call saves the full snapshot while still holding the list
/// lock, so the persisted order of snapshots matches the order of mutations.
/// Store failures are logged and swallowed; the in-memory list stays
/// authoritative for the lifetime of the process.
pub struct MutationQueue<S: QueueStore> {
    items: Mutex<Vec<SyncQueueItem>>,
    store: S,
}

impl<S: QueueStore> MutationQueue<S> {
    /// Loads the queue from `store`.
    ///
    /// A missing or undecodable snapshot yields an empty queue. Duplicate ids
    /// in the snapshot are collapsed, keeping the first occurrence.
    pub fn load(store: S) -> Self {
        let items = match store.load() {
            Ok(items) => dedup_by_id(items),
            Err(e) => {
                warn!("Discarding unreadable queue snapshot: {}", e);
                Vec::new()
            }
        };
        debug!("Loaded {} queued mutations", items.len());

        Self {
            items: Mutex::new(items),
            store,
        }
    }

    /// Builds an item created at `now_ms` and appends it.
    ///
    /// Without an explicit `id` one is generated as
    /// `{kind}_{uuid}_{now_ms}`. Returns the id and whether a new item was
    /// inserted; an id that is already pending is left untouched.
    pub fn enqueue(
        &self,
        mutation: Mutation,
        priority: Priority,
        id: Option<String>,
        now_ms: u64,
    ) -> (String, bool) {
        let id = id.unwrap_or_else(|| {
            let subject = Uuid::new_v4().simple().to_string();
            SyncQueueItem::make_id(mutation.kind(), &subject, now_ms)
        });
        let inserted = self.push(SyncQueueItem::new(id.clone(), mutation, priority, now_ms));
        (id, inserted)
    }

    /// Appends `item` unless an item with the same id is pending.
    ///
    /// Returns true if the item was inserted. A duplicate leaves the pending
    /// item untouched and writes nothing.
    pub fn push(&self, item: SyncQueueItem) -> bool {
        let mut items = self.items.lock();
        if items.iter().any(|existing| existing.id == item.id) {
            debug!("Ignoring duplicate enqueue of {}", item.id);
            return false;
        }
        items.push(item);
        self.save_locked(&items);
        true
    }

    /// Removes the item with `id`. Returns true if it was pending.
    pub fn remove(&self, id: &str) -> bool {
        let mut items = self.items.lock();
        let before = items.len();
        items.retain(|item| item.id != id);
        if items.len() == before {
            return false;
        }
        self.save_locked(&items);
        true
    }

    /// Records a failed attempt at `now_ms`.
    ///
    /// Returns the new attempt count, or `None` if the item is gone.
    pub fn record_attempt(&self, id: &str, now_ms: u64) -> Option<u32> {
        let mut items = self.items.lock();
        let item = items.iter_mut().find(|item| item.id == id)?;
        item.attempts = item.attempts.saturating_add(1);
        item.last_attempt_at = now_ms;
        let attempts = item.attempts;
        self.save_locked(&items);
        Some(attempts)
    }

    /// Removes every item. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut items = self.items.lock();
        let dropped = items.len();
        items.clear();
        self.save_locked(&items);
        dropped
    }

    /// Saves the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns the store error; the in-memory list is unaffected.
    pub fn persist(&self) -> SyncResult<()> {
        let items = self.items.lock();
        self.store.save(&items)
    }

    /// Returns a copy of the pending items in insertion order.
    pub fn snapshot(&self) -> Vec<SyncQueueItem> {
        self.items.lock().clone()
    }

    /// Returns a copy of the pending items in processing order.
    pub fn sorted_snapshot(&self) -> Vec<SyncQueueItem> {
        let mut items = self.snapshot();
        items.sort_by_key(SyncQueueItem::order_key);
        items
    }

    /// Returns the pending item with `id`.
    pub fn get(&self, id: &str) -> Option<SyncQueueItem> {
        self.items.lock().iter().find(|item| item.id == id).cloned()
    }

    /// Returns true if an item with `id` is pending.
    pub fn contains(&self, id: &str) -> bool {
        self.items.lock().iter().any(|item| item.id == id)
    }

    /// Number of pending items.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Summarizes the queue as seen at `now_ms`.
    pub fn stats(&self, now_ms: u64) -> QueueStats {
        let items = self.items.lock();
        let mut stats = QueueStats {
            total_pending: items.len(),
            ..QueueStats::default()
        };

        for item in items.iter() {
            *stats
                .by_kind
                .entry(item.kind().as_str().to_string())
                .or_insert(0) += 1;
            if item.attempts > 0 {
                stats.items_with_failed_attempts += 1;
            }
        }

        if let Some(oldest) = items.iter().map(|item| item.created_at).min() {
            stats.oldest_item_age_ms = now_ms.saturating_sub(oldest);
        }

        stats
    }

    fn save_locked(&self, items: &[SyncQueueItem]) {
        if let Err(e) = self.store.save(items) {
            warn!("Failed to persist queue snapshot ({} items): {}", items.len(), e);
        }
    }
}

fn dedup_by_id(items: Vec<SyncQueueItem>) -> Vec<SyncQueueItem> {
    let mut seen = HashSet::new();
    let total = items.len();
    let unique: Vec<_> = items
        .into_iter()
        .filter(|item| seen.insert(item.id.clone()))
        .collect();
    if unique.len() != total {
        warn!(
            "Queue snapshot contained {} duplicate ids",
            total - unique.len()
        );
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_STORAGE_KEY;
    use crate::item::{Mutation, Priority};
    use crate::store::BackendStore;
    use serde_json::json;
    use std::sync::Arc;
    use syncq_storage::InMemoryBackend;

    fn item(id: &str, priority: Priority, created_at: u64) -> SyncQueueItem {
        SyncQueueItem::new(
            id.into(),
            Mutation::Favorite(json!({"attractionId": id})),
            priority,
            created_at,
        )
    }

    fn memory_queue() -> (Arc<InMemoryBackend>, MutationQueue<BackendStore<InMemoryBackend>>) {
        let backend = Arc::new(InMemoryBackend::new());
        let queue = MutationQueue::load(BackendStore::new(Arc::clone(&backend)));
        (backend, queue)
    }

    fn reload(backend: &Arc<InMemoryBackend>) -> MutationQueue<BackendStore<InMemoryBackend>> {
        MutationQueue::load(BackendStore::new(Arc::clone(backend)))
    }

    #[test]
    fn push_persists_immediately() {
        let (backend, queue) = memory_queue();
        assert!(queue.push(item("a", Priority::High, 1)));

        let restarted = reload(&backend);
        let items = restarted.snapshot();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "a");
        assert_eq!(items[0].attempts, 0);
    }

    #[test]
    fn enqueue_generates_or_keeps_ids() {
        let (_backend, queue) = memory_queue();
        let (generated, inserted) =
            queue.enqueue(Mutation::Review(json!({})), Priority::Low, None, 77);
        assert!(inserted);
        assert!(generated.starts_with("review_"));
        assert!(generated.ends_with("_77"));

        let (id, inserted) = queue.enqueue(
            Mutation::Favorite(json!({})),
            Priority::High,
            Some("fav-1".into()),
            78,
        );
        assert_eq!(id, "fav-1");
        assert!(inserted);

        let (_, inserted) = queue.enqueue(
            Mutation::Favorite(json!({"other": true})),
            Priority::Low,
            Some("fav-1".into()),
            79,
        );
        assert!(!inserted);
        assert_eq!(queue.get("fav-1").unwrap().created_at, 78);
    }

    #[test]
    fn duplicate_push_is_noop() {
        let (backend, queue) = memory_queue();
        assert!(queue.push(item("a", Priority::High, 1)));
        queue.record_attempt("a", 50).unwrap();
        let writes = backend.write_count();

        assert!(!queue.push(item("a", Priority::Low, 2)));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.get("a").unwrap().attempts, 1);
        assert_eq!(queue.get("a").unwrap().priority, Priority::High);
        assert_eq!(backend.write_count(), writes);
    }

    #[test]
    fn record_attempt_updates_and_persists() {
        let (backend, queue) = memory_queue();
        queue.push(item("a", Priority::High, 1));

        assert_eq!(queue.record_attempt("a", 100), Some(1));
        assert_eq!(queue.record_attempt("a", 200), Some(2));
        assert_eq!(queue.record_attempt("missing", 300), None);

        let restarted = reload(&backend);
        let a = restarted.get("a").unwrap();
        assert_eq!(a.attempts, 2);
        assert_eq!(a.last_attempt_at, 200);
    }

    #[test]
    fn remove_and_clear() {
        let (backend, queue) = memory_queue();
        queue.push(item("a", Priority::High, 1));
        queue.push(item("b", Priority::High, 2));
        queue.push(item("c", Priority::High, 3));

        assert!(queue.remove("b"));
        assert!(!queue.remove("b"));
        assert_eq!(reload(&backend).len(), 2);

        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
        assert!(reload(&backend).is_empty());
    }

    #[test]
    fn sorted_snapshot_orders_by_priority_then_age() {
        let (_backend, queue) = memory_queue();
        queue.push(item("low-old", Priority::Low, 1));
        queue.push(item("high-new", Priority::High, 30));
        queue.push(item("medium", Priority::Medium, 5));
        queue.push(item("high-old", Priority::High, 10));

        let ids: Vec<_> = queue.sorted_snapshot().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["high-old", "high-new", "medium", "low-old"]);
    }

    #[test]
    fn corrupt_snapshot_loads_empty() {
        let backend = Arc::new(InMemoryBackend::with_value(
            DEFAULT_STORAGE_KEY,
            b"[{\"id\": 3".to_vec(),
        ));
        let queue = reload(&backend);
        assert!(queue.is_empty());

        // Still usable afterwards.
        assert!(queue.push(item("a", Priority::High, 1)));
        assert_eq!(reload(&backend).len(), 1);
    }

    #[test]
    fn snapshot_duplicates_are_collapsed() {
        let backend = Arc::new(InMemoryBackend::new());
        BackendStore::new(Arc::clone(&backend))
            .save(&[
                item("a", Priority::High, 1),
                item("a", Priority::Low, 2),
                item("b", Priority::Low, 3),
            ])
            .unwrap();

        let queue = reload(&backend);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.get("a").unwrap().priority, Priority::High);
    }

    #[test]
    fn store_failure_keeps_memory_state() {
        let (backend, queue) = memory_queue();
        backend.set_fail_writes(true);

        assert!(queue.push(item("a", Priority::High, 1)));
        assert_eq!(queue.len(), 1);
        assert!(queue.persist().is_err());

        backend.set_fail_writes(false);
        queue.persist().unwrap();
        assert_eq!(reload(&backend).len(), 1);
    }

    #[test]
    fn stats_summary() {
        let (_backend, queue) = memory_queue();
        assert_eq!(queue.stats(1_000), QueueStats::default());

        queue.push(item("a", Priority::High, 100));
        queue.push(SyncQueueItem::new(
            "r".into(),
            Mutation::Review(json!({"text": "great"})),
            Priority::Low,
            400,
        ));
        queue.push(item("b", Priority::High, 300));
        queue.record_attempt("r", 500);

        let stats = queue.stats(1_000);
        assert_eq!(stats.total_pending, 3);
        assert_eq!(stats.by_kind.get("favorite"), Some(&2));
        assert_eq!(stats.by_kind.get("review"), Some(&1));
        assert_eq!(stats.oldest_item_age_ms, 900);
        assert_eq!(stats.items_with_failed_attempts, 1);
    }
}
