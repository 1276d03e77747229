//! Handlers with scripted behavior for delivery tests.

use parking_lot::{Condvar, Mutex};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use syncq_engine::{Handler, SyncError, SyncResult};

/// A handler that records every payload and answers from a script.
///
/// The first `failures` calls fail with a retryable delivery error; every
/// later call succeeds. `usize::MAX` failures means "always fail".
#[derive(Debug)]
pub struct ScriptedHandler {
    failures: usize,
    calls: Mutex<Vec<Value>>,
}

impl ScriptedHandler {
    /// A handler that fails the first `failures` calls.
    pub fn failing_times(failures: usize) -> Arc<Self> {
        Arc::new(Self {
            failures,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// A handler that always succeeds.
    pub fn always_ok() -> Arc<Self> {
        Self::failing_times(0)
    }

    /// A handler that always fails.
    pub fn always_fail() -> Arc<Self> {
        Self::failing_times(usize::MAX)
    }

    /// Number of invocations so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Payloads received, in call order.
    pub fn payloads(&self) -> Vec<Value> {
        self.calls.lock().clone()
    }
}

impl Handler for ScriptedHandler {
    fn handle(&self, payload: &Value) -> SyncResult<()> {
        let mut calls = self.calls.lock();
        calls.push(payload.clone());
        if calls.len() <= self.failures {
            Err(SyncError::delivery_retryable(format!(
                "scripted failure {}",
                calls.len()
            )))
        } else {
            Ok(())
        }
    }
}

/// A handler that blocks inside `handle` until released, tracking how many
/// invocations run at once.
#[derive(Debug, Default)]
pub struct BlockingHandler {
    released: Mutex<bool>,
    release: Condvar,
    active: AtomicUsize,
    max_active: AtomicUsize,
    entered: AtomicUsize,
}

impl BlockingHandler {
    /// Creates a closed gate.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Lets every current and future invocation finish.
    pub fn release(&self) {
        *self.released.lock() = true;
        self.release.notify_all();
    }

    /// Waits until at least `count` invocations have entered `handle`.
    ///
    /// Returns false on timeout.
    pub fn wait_entered(&self, count: usize, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        while self.entered.load(Ordering::SeqCst) < count {
            if std::time::Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        true
    }

    /// Total invocations.
    pub fn entered(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }

    /// Highest number of invocations observed running at once.
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

impl Handler for BlockingHandler {
    fn handle(&self, _payload: &Value) -> SyncResult<()> {
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        self.entered.fetch_add(1, Ordering::SeqCst);

        let mut released = self.released.lock();
        while !*released {
            self.release.wait(&mut released);
        }
        drop(released);

        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scripted_failures_then_success() {
        let handler = ScriptedHandler::failing_times(2);
        assert!(handler.handle(&json!(1)).is_err());
        assert!(handler.handle(&json!(2)).is_err());
        assert!(handler.handle(&json!(3)).is_ok());
        assert_eq!(handler.payloads(), vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn always_fail_never_succeeds() {
        let handler = ScriptedHandler::always_fail();
        for _ in 0..10 {
            assert!(handler.handle(&json!({})).is_err());
        }
        assert_eq!(handler.call_count(), 10);
    }

    #[test]
    fn blocking_handler_gate() {
        let handler = BlockingHandler::new();
        let worker = Arc::clone(&handler);
        let join = std::thread::spawn(move || worker.handle(&json!({})));

        assert!(handler.wait_entered(1, Duration::from_secs(5)));
        handler.release();
        assert!(join.join().unwrap().is_ok());
        assert_eq!(handler.max_concurrent(), 1);
    }
}
