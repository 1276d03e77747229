//! Configuration for the sync engine.

use crate::item::SyncQueueItem;
use std::time::Duration;

/// Storage key under which the queue snapshot is persisted.
pub const DEFAULT_STORAGE_KEY: &str = "sync_queue";

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Attempts after which an item is evicted.
    pub max_attempts: u32,
    /// Interval of the periodic sync timer.
    pub sync_interval: Duration,
    /// Backoff between retries of one item.
    pub backoff: BackoffPolicy,
    /// Storage key for the queue snapshot.
    pub storage_key: String,
    /// Buffered pass reports per subscriber before the slowest lags.
    pub report_channel_capacity: usize,
    /// Whether a successful enqueue triggers a pass while online.
    pub sync_on_enqueue: bool,
}

impl SyncConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            max_attempts: 5,
            sync_interval: Duration::from_secs(30),
            backoff: BackoffPolicy::default(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            report_channel_capacity: 64,
            sync_on_enqueue: true,
        }
    }

    /// Sets the maximum number of delivery attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the periodic sync interval.
    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    /// Sets the backoff policy.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the storage key.
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Sets the report channel capacity.
    pub fn with_report_channel_capacity(mut self, capacity: usize) -> Self {
        self.report_channel_capacity = capacity.max(1);
        self
    }

    /// Enables or disables triggering a pass on enqueue.
    pub fn with_sync_on_enqueue(mut self, enabled: bool) -> Self {
        self.sync_on_enqueue = enabled;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Exponential backoff between delivery attempts of one item.
///
/// `delay(n) = min(initial_delay * multiplier^n, max_delay)`.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Delay after the first failure.
    pub initial_delay: Duration,
    /// Upper bound on any delay.
    pub max_delay: Duration,
    /// Growth factor per failed attempt.
    pub multiplier: u32,
}

impl BackoffPolicy {
    /// Creates a policy with the given initial and maximum delay.
    pub fn new(initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay,
            multiplier: 2,
        }
    }

    /// A policy where every item is always eligible.
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = multiplier.max(1);
        self
    }

    /// Calculates the delay owed after `attempts` failed attempts.
    pub fn delay_for_attempt(&self, attempts: u32) -> Duration {
        let initial_ms = self.initial_delay.as_millis().min(u64::MAX as u128) as u64;
        let max_ms = self.max_delay.as_millis().min(u64::MAX as u128) as u64;

        let factor = (self.multiplier as u64).checked_pow(attempts);
        let delay_ms = match factor {
            Some(factor) => initial_ms.saturating_mul(factor),
            None if initial_ms == 0 => 0,
            None => u64::MAX,
        };

        Duration::from_millis(delay_ms.min(max_ms))
    }

    /// Returns true if `item` may be attempted at `now_ms`.
    ///
    /// Items never attempted are always eligible.
    pub fn is_eligible(&self, item: &SyncQueueItem, now_ms: u64) -> bool {
        if item.attempts == 0 {
            return true;
        }
        let elapsed = now_ms.saturating_sub(item.last_attempt_at);
        elapsed >= self.delay_for_attempt(item.attempts).as_millis() as u64
    }

    /// Milliseconds until `item` becomes eligible; zero if it already is.
    pub fn remaining_ms(&self, item: &SyncQueueItem, now_ms: u64) -> u64 {
        if item.attempts == 0 {
            return 0;
        }
        let due = item
            .last_attempt_at
            .saturating_add(self.delay_for_attempt(item.attempts).as_millis() as u64);
        due.saturating_sub(now_ms)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(60))
    }
}
