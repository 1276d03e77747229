//! # SyncQ Engine
//!
//! Offline-first mutation queue and sync engine.
//!
//! This crate provides:
//! - A persisted, priority-ordered queue of pending mutations
//! - Exponential backoff per item with a bounded attempt budget
//! - Per-kind handler routing that fails closed
//! - A background scheduler (enqueue, reconnect, timer and manual triggers)
//! - Single-flight sync passes with per-item outcome reports
//!
//! ## Architecture
//!
//! ```text
//! enqueue ─► MutationQueue ─► QueueStore::save
//!               │
//! triggers ─► scheduler ─► pass ─► Dispatcher ─► Handler
//!                                   │
//!                     remove | record_attempt ─► QueueStore::save
//! ```
//!
//! ## Key Invariants
//!
//! - At most one pending item per id; duplicate enqueue is a no-op
//! - The persisted snapshot is rewritten after every queue mutation
//! - Items are attempted by priority, then age
//! - At most one pass runs at a time; triggers during a pass are dropped
//! - Delivery is at-least-once; handlers must be idempotent

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod config;
mod dispatcher;
mod engine;
mod error;
mod item;
mod network;
mod queue;
mod report;
mod scheduler;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BackoffPolicy, SyncConfig, DEFAULT_STORAGE_KEY};
pub use dispatcher::{handler_fn, DispatchOutcome, Dispatcher, Handler};
pub use engine::SyncEngine;
pub use error::{SyncError, SyncResult};
pub use item::{Mutation, MutationKind, Priority, SyncQueueItem};
pub use network::{AlwaysOnline, ManualNetworkMonitor, NetworkMonitor};
pub use queue::{MutationQueue, QueueStats};
pub use report::{
    EngineState, EngineStats, EvictionReason, ItemOutcome, ItemResult, PassReport, PassTrigger,
};
pub use store::{BackendStore, QueueStore};
