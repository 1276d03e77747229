//! # SyncQ Testkit
//!
//! Test utilities for SyncQ.
//!
//! This crate provides:
//! - Engine fixtures over in-memory and temporary file stores
//! - Scripted and blocking handlers for delivery scenarios
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use syncq_testkit::prelude::*;
//!
//! #[test]
//! fn delivers() {
//!     let fixture = EngineFixture::online();
//!     let handler = ScriptedHandler::always_ok();
//!     fixture.engine.register_handler(MutationKind::Favorite, handler.clone());
//!     // ... enqueue and sync
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod handlers;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::handlers::*;
    pub use syncq_engine::{
        Mutation, MutationKind, Priority, SyncConfig, SyncEngine, SyncQueueItem,
    };
}

pub use fixtures::*;
pub use generators::*;
pub use handlers::*;
