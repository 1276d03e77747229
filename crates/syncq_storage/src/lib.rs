//! # SyncQ Storage
//!
//! Key/value storage backends for the SyncQ mutation queue.
//!
//! Backends are **opaque byte stores** keyed by short names. They do not
//! interpret the values they hold; the engine owns the snapshot format.
//!
//! ## Design Principles
//!
//! - A `put` replaces the whole value for a key, atomically
//! - No knowledge of queue items or their encoding
//! - Must be `Send + Sync` for concurrent access
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral queues
//! - [`FileBackend`] - One file per key inside a locked directory
//!
//! ## Example
//!
//! ```rust
//! use syncq_storage::{StorageBackend, InMemoryBackend};
//!
//! let backend = InMemoryBackend::new();
//! backend.put("sync_queue", b"[]").unwrap();
//! assert_eq!(backend.get("sync_queue").unwrap(), Some(b"[]".to_vec()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::{validate_key, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
