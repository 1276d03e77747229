//! Routing of queue items to per-kind handlers.

use crate::error::{SyncError, SyncResult};
use crate::item::{MutationKind, SyncQueueItem};
use parking_lot::RwLock;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Delivers one kind of mutation to the remote service.
///
/// Delivery is at-least-once: the same payload may be handed over again
/// after a crash or a lost acknowledgement, so implementations must be
/// idempotent. Any `Err` counts as a failed attempt and is retried with
/// backoff until the attempt budget runs out.
pub trait Handler: Send + Sync {
    /// Delivers `payload`.
    fn handle(&self, payload: &Value) -> SyncResult<()>;
}

impl<F> Handler for F
where
    F: Fn(&Value) -> SyncResult<()> + Send + Sync,
{
    fn handle(&self, payload: &Value) -> SyncResult<()> {
        self(payload)
    }
}

/// Wraps a closure as a shareable handler.
///
/// ```rust
/// use syncq_engine::{handler_fn, Handler};
///
/// let handler = handler_fn(|payload| {
///     assert!(payload.is_object());
///     Ok(())
/// });
/// handler.handle(&serde_json::json!({})).unwrap();
/// ```
pub fn handler_fn<F>(f: F) -> Arc<dyn Handler>
where
    F: Fn(&Value) -> SyncResult<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Result of dispatching one item.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The handler accepted the mutation.
    Delivered,
    /// The handler failed or panicked.
    Failed(SyncError),
    /// No handler is registered for the item's kind.
    Unrouted,
}

/// Maps mutation kinds to handlers.
#[derive(Default)]
pub struct Dispatcher {
    handlers: RwLock<HashMap<MutationKind, Arc<dyn Handler>>>,
}

impl Dispatcher {
    /// Creates a dispatcher with no handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `kind`, replacing any previous one.
    pub fn register(&self, kind: MutationKind, handler: Arc<dyn Handler>) {
        self.handlers.write().insert(kind, handler);
    }

    /// Removes the handler for `kind`. Returns true if one was registered.
    pub fn unregister(&self, kind: MutationKind) -> bool {
        self.handlers.write().remove(&kind).is_some()
    }

    /// Returns true if `kind` has a handler.
    pub fn is_registered(&self, kind: MutationKind) -> bool {
        self.handlers.read().contains_key(&kind)
    }

    /// Delivers `item` through its handler.
    ///
    /// The handler runs without the registry lock held. A panic inside the
    /// handler is caught and reported as a failed attempt.
    pub fn dispatch(&self, item: &SyncQueueItem) -> DispatchOutcome {
        let handler = match self.handlers.read().get(&item.kind()) {
            Some(handler) => Arc::clone(handler),
            None => return DispatchOutcome::Unrouted,
        };

        let payload = item.mutation.payload();
        match catch_unwind(AssertUnwindSafe(|| handler.handle(payload))) {
            Ok(Ok(())) => DispatchOutcome::Delivered,
            Ok(Err(e)) => DispatchOutcome::Failed(e),
            Err(panic) => {
                DispatchOutcome::Failed(SyncError::HandlerPanicked(panic_message(&*panic)))
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
