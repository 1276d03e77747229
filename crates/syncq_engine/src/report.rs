//! Pass results and engine statistics.

use crate::item::MutationKind;
use std::time::Duration;

/// The current state of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No pass is running.
    Idle,
    /// A pass is running.
    Syncing,
}

/// What caused a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassTrigger {
    /// A mutation was enqueued while online.
    Enqueue,
    /// The network came back.
    Reconnect,
    /// The periodic timer fired.
    Timer,
    /// A caller asked for a pass.
    Manual,
}

/// Why an item was permanently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    /// The attempt budget is spent.
    MaxAttempts,
    /// No handler is registered for the item's kind.
    NoHandler,
}

/// What happened to one item during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Delivered and removed.
    Delivered,
    /// Failed; stays queued for another attempt.
    Retrying {
        /// Attempts recorded so far.
        attempts: u32,
        /// Handler error message.
        error: String,
    },
    /// Removed without further attempts.
    Evicted {
        /// Why the item was dropped.
        reason: EvictionReason,
        /// Last handler error, if the eviction followed a failure.
        error: Option<String>,
    },
    /// Still backing off; not attempted.
    Deferred {
        /// Milliseconds until the item becomes eligible.
        retry_in_ms: u64,
    },
}

impl ItemOutcome {
    /// Returns true for terminal outcomes.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemOutcome::Delivered | ItemOutcome::Evicted { .. })
    }
}

/// Per-item result of a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemResult {
    /// Item id.
    pub id: String,
    /// Item kind.
    pub kind: MutationKind,
    /// Outcome.
    pub outcome: ItemOutcome,
}

/// Result of one sync pass.
#[derive(Debug, Clone)]
pub struct PassReport {
    /// What started the pass.
    pub trigger: PassTrigger,
    /// Whether the network was online at pass start.
    pub online: bool,
    /// Pass start, epoch milliseconds.
    pub started_at: u64,
    /// Wall time spent.
    pub duration: Duration,
    /// Outcomes in processing order.
    pub results: Vec<ItemResult>,
}

impl PassReport {
    /// Number of delivered items.
    pub fn delivered(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Delivered))
    }

    /// Number of items that failed and remain queued.
    pub fn retrying(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Retrying { .. }))
    }

    /// Number of evicted items.
    pub fn evicted(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Evicted { .. }))
    }

    /// Number of items skipped for backoff.
    pub fn deferred(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Deferred { .. }))
    }

    /// Outcome recorded for `id`, if any.
    pub fn outcome_of(&self, id: &str) -> Option<&ItemOutcome> {
        self.results
            .iter()
            .find(|r| r.id == id)
            .map(|r| &r.outcome)
    }

    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Cumulative statistics about sync operations.
#[derive(Debug, Clone, Default)]
pub struct EngineStats {
    /// Passes that ran to completion (including no-op passes).
    pub passes_completed: u64,
    /// Items delivered.
    pub delivered: u64,
    /// Failed attempts that left the item queued.
    pub retried: u64,
    /// Items evicted.
    pub evicted: u64,
    /// Item skips due to backoff.
    pub deferred: u64,
    /// Triggers dropped because a pass was already running.
    pub coalesced_triggers: u64,
    /// Start of the last completed pass, epoch milliseconds.
    pub last_pass_at: Option<u64>,
    /// Last handler error seen.
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, outcome: ItemOutcome) -> ItemResult {
        ItemResult {
            id: id.into(),
            kind: MutationKind::Favorite,
            outcome,
        }
    }

    #[test]
    fn report_counts() {
        let report = PassReport {
            trigger: PassTrigger::Manual,
            online: true,
            started_at: 0,
            duration: Duration::ZERO,
            results: vec![
                result("a", ItemOutcome::Delivered),
                result(
                    "b",
                    ItemOutcome::Retrying {
                        attempts: 1,
                        error: "503".into(),
                    },
                ),
                result(
                    "c",
                    ItemOutcome::Evicted {
                        reason: EvictionReason::NoHandler,
                        error: None,
                    },
                ),
                result("d", ItemOutcome::Deferred { retry_in_ms: 10 }),
            ],
        };

        assert_eq!(report.delivered(), 1);
        assert_eq!(report.retrying(), 1);
        assert_eq!(report.evicted(), 1);
        assert_eq!(report.deferred(), 1);
        assert_eq!(report.outcome_of("a"), Some(&ItemOutcome::Delivered));
        assert_eq!(report.outcome_of("z"), None);
    }

    #[test]
    fn terminal_outcomes() {
        assert!(ItemOutcome::Delivered.is_terminal());
        assert!(ItemOutcome::Evicted {
            reason: EvictionReason::MaxAttempts,
            error: None
        }
        .is_terminal());
        assert!(!ItemOutcome::Deferred { retry_in_ms: 0 }.is_terminal());
    }
}
