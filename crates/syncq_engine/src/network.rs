//! Connectivity source abstraction.

use tokio::sync::watch;

/// Reports whether the remote service is reachable.
///
/// Implementations that can push transitions return a `watch` receiver from
/// [`NetworkMonitor::subscribe`]; the engine wakes on offline→online
/// changes. Without a subscription the engine falls back to polling
/// `is_online` at the start of every pass.
pub trait NetworkMonitor: Send + Sync {
    /// Current connectivity.
    fn is_online(&self) -> bool;

    /// Subscribes to connectivity changes, if supported.
    fn subscribe(&self) -> Option<watch::Receiver<bool>> {
        None
    }
}

/// A monitor that is always online and never notifies.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysOnline;

impl NetworkMonitor for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}

/// A monitor whose state is set by the host application.
///
/// Useful when the platform delivers connectivity callbacks: forward them to
/// [`ManualNetworkMonitor::set_online`].
#[derive(Debug)]
pub struct ManualNetworkMonitor {
    tx: watch::Sender<bool>,
}

impl ManualNetworkMonitor {
    /// Creates a monitor with the given initial state.
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx }
    }

    /// Updates connectivity, notifying subscribers on change.
    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
    }
}

impl NetworkMonitor for ManualNetworkMonitor {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> Option<watch::Receiver<bool>> {
        Some(self.tx.subscribe())
    }
}

impl<T: NetworkMonitor + ?Sized> NetworkMonitor for std::sync::Arc<T> {
    fn is_online(&self) -> bool {
        (**self).is_online()
    }

    fn subscribe(&self) -> Option<watch::Receiver<bool>> {
        (**self).subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_online() {
        assert!(AlwaysOnline.is_online());
        assert!(AlwaysOnline.subscribe().is_none());
    }

    #[test]
    fn manual_monitor_state() {
        let monitor = ManualNetworkMonitor::new(false);
        assert!(!monitor.is_online());

        monitor.set_online(true);
        assert!(monitor.is_online());
    }

    #[tokio::test]
    async fn manual_monitor_notifies_on_change_only() {
        let monitor = ManualNetworkMonitor::new(false);
        let mut rx = monitor.subscribe().unwrap();

        monitor.set_online(false);
        assert!(!rx.has_changed().unwrap());

        monitor.set_online(true);
        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());
    }
}
