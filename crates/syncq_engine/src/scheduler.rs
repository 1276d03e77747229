//! Background task deciding when passes run.
//!
//! One task selects over shutdown, explicit triggers, network transitions
//! and the periodic timer. Passes run on the blocking pool and are awaited
//! before the next event is taken, so the task never overlaps passes.
//! Triggers raised mid-pass never reach the channel; the engine counts them
//! as coalesced before sending.

use crate::engine::EngineInner;
use crate::network::NetworkMonitor;
use crate::report::PassTrigger;
use crate::store::QueueStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Handle to a running scheduler task.
pub(crate) struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Signals shutdown and waits for the task to exit.
    pub(crate) async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("Sync scheduler task failed: {}", e);
            }
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        // Dropped without `shutdown`: let the task wind down on its own.
        let _ = self.shutdown.send(true);
    }
}

enum Event {
    Shutdown,
    Trigger(PassTrigger),
    Network(Option<bool>),
    Tick,
}

/// Spawns the scheduler for `inner` on `runtime`.
pub(crate) fn spawn<S, N>(
    runtime: &Handle,
    inner: Arc<EngineInner<S, N>>,
    triggers: mpsc::Receiver<PassTrigger>,
) -> SchedulerHandle
where
    S: QueueStore + 'static,
    N: NetworkMonitor + 'static,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Subscribe before spawning so no transition between now and the first
    // poll of the task is missed.
    let mut network = inner.network.subscribe();
    let online = match network.as_mut() {
        Some(rx) => *rx.borrow_and_update(),
        None => inner.network.is_online(),
    };

    let task = runtime.spawn(run(inner, triggers, shutdown_rx, network, online));
    SchedulerHandle {
        shutdown: shutdown_tx,
        task: Some(task),
    }
}

async fn run<S, N>(
    inner: Arc<EngineInner<S, N>>,
    mut triggers: mpsc::Receiver<PassTrigger>,
    mut shutdown: watch::Receiver<bool>,
    mut network: Option<watch::Receiver<bool>>,
    mut was_online: bool,
) where
    S: QueueStore + 'static,
    N: NetworkMonitor + 'static,
{
    let period = inner.config.sync_interval.max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let event = tokio::select! {
            biased;
            _ = shutdown.changed() => Event::Shutdown,
            Some(trigger) = triggers.recv() => Event::Trigger(trigger),
            state = next_network_state(&mut network) => Event::Network(state),
            _ = ticker.tick() => Event::Tick,
        };

        let trigger = match event {
            Event::Shutdown => break,
            Event::Trigger(trigger) => trigger,
            Event::Tick => PassTrigger::Timer,
            Event::Network(None) => {
                debug!("Network monitor closed; falling back to polling");
                network = None;
                continue;
            }
            Event::Network(Some(online)) => {
                let reconnected = online && !was_online;
                was_online = online;
                if !reconnected {
                    debug!("Network went offline");
                    continue;
                }
                info!("Network reconnected; scheduling sync pass");
                PassTrigger::Reconnect
            }
        };

        let worker = Arc::clone(&inner);
        if let Err(e) = tokio::task::spawn_blocking(move || worker.run_pass(trigger)).await {
            error!("Sync pass task failed: {}", e);
        }
    }

    debug!("Sync scheduler exited");
}

async fn next_network_state(network: &mut Option<watch::Receiver<bool>>) -> Option<bool> {
    match network {
        Some(rx) => match rx.changed().await {
            Ok(()) => Some(*rx.borrow_and_update()),
            Err(_) => None,
        },
        None => std::future::pending().await,
    }
}
