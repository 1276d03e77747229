//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random queue contents that respect
//! the queue's invariants (unique ids, attempts within budget).

use proptest::prelude::*;
use serde_json::{json, Value};
use syncq_engine::{Mutation, MutationKind, Priority, SyncQueueItem};

/// Strategy for priorities.
pub fn priority_strategy() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::High),
        Just(Priority::Medium),
        Just(Priority::Low),
    ]
}

/// Strategy for mutation kinds.
pub fn kind_strategy() -> impl Strategy<Value = MutationKind> {
    prop::sample::select(MutationKind::ALL.to_vec())
}

/// Strategy for small JSON object payloads.
pub fn payload_strategy() -> impl Strategy<Value = Value> {
    (
        prop::string::string_regex("[a-z][a-z0-9]{0,11}").expect("Invalid regex"),
        any::<i32>(),
    )
        .prop_map(|(subject, n)| json!({ "subjectId": subject, "value": n }))
}

/// Strategy for mutations of any kind.
pub fn mutation_strategy() -> impl Strategy<Value = Mutation> {
    (kind_strategy(), payload_strategy()).prop_map(|(kind, payload)| kind.with_payload(payload))
}

/// Strategy for a list of items with unique ids and `attempts < max_attempts`.
pub fn items_strategy(
    max_items: usize,
    max_attempts: u32,
) -> impl Strategy<Value = Vec<SyncQueueItem>> {
    prop::collection::vec(
        (
            mutation_strategy(),
            priority_strategy(),
            0u64..1_000_000,
            0..max_attempts.max(1),
        ),
        0..=max_items,
    )
    .prop_map(|entries| {
        entries
            .into_iter()
            .enumerate()
            .map(|(i, (mutation, priority, created_at, attempts))| {
                let id = SyncQueueItem::make_id(mutation.kind(), &format!("s{i}"), created_at);
                let mut item = SyncQueueItem::new(id, mutation, priority, created_at);
                item.attempts = attempts;
                item.last_attempt_at = if attempts > 0 { created_at + 1 } else { 0 };
                item
            })
            .collect()
    })
}
