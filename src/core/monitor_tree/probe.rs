//! Tokio runtime and per-leaf probe tasks.
//!
//! Each started leaf owns one probe task that ticks on the worker's interval,
//! runs the check on the blocking pool and records the outcome on the leaf.

use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};
use tokio::time::{interval, MissedTickBehavior};

use super::leaf::{CheckResult, LeafNode, Worker};
use crate::error::{FleetError, Result};

/// Wrapper around the Tokio runtime that drives leaf probes.
pub struct WorkerRuntime {
    runtime: tokio::runtime::Runtime,
}

impl WorkerRuntime {
    /// Create a runtime with `worker_threads` threads (at least one).
    pub fn new(worker_threads: usize) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .enable_time()
            .thread_name("fleet-probe")
            .build()?;

        log::debug!("Probe runtime started with {} threads", worker_threads.max(1));
        Ok(Self { runtime })
    }

    pub fn handle(&self) -> Handle {
        self.runtime.handle().clone()
    }

    /// Shut the runtime down, giving running checks a moment to finish.
    pub fn shutdown(self) {
        self.runtime.shutdown_timeout(Duration::from_secs(1));
    }
}

/// Owner side of a running probe task
pub(crate) struct ProbeHandle {
    shutdown_tx: watch::Sender<bool>,
    done_rx: Option<oneshot::Receiver<()>>,
}

impl ProbeHandle {
    /// Signal the task and wait until it confirms it has exited.
    ///
    /// Must not be called from inside an async context.
    pub(crate) fn stop(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(done_rx) = self.done_rx.take() {
            // An error only means the task is already gone
            let _ = done_rx.blocking_recv();
        }
    }
}

pub(crate) fn spawn_probe(
    handle: &Handle,
    leaf: Weak<LeafNode>,
    worker: Arc<dyn Worker>,
    period: Duration,
) -> ProbeHandle {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (done_tx, done_rx) = oneshot::channel();

    handle.spawn(async move {
        probe_task(leaf, worker, period, shutdown_rx).await;
        let _ = done_tx.send(());
    });

    ProbeHandle {
        shutdown_tx,
        done_rx: Some(done_rx),
    }
}

async fn probe_task(
    leaf: Weak<LeafNode>,
    worker: Arc<dyn Worker>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(period.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let result = run_check(Arc::clone(&worker)).await;

                if *shutdown.borrow() {
                    break;
                }
                match leaf.upgrade() {
                    Some(node) => node.record(result),
                    None => break,
                }
            }
            _ = shutdown.changed() => {
                break;
            }
        }
    }
}

/// Run one check, turning failures and panics into an `Unknown` result.
async fn run_check(worker: Arc<dyn Worker>) -> CheckResult {
    match tokio::task::spawn_blocking(move || worker.check()).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            log::warn!("Health check failed: {}", e);
            CheckResult::from_error(&e)
        }
        Err(join_error) => {
            let error = FleetError::worker(format!("check aborted: {}", join_error));
            log::warn!("{}", error);
            CheckResult::from_error(&error)
        }
    }
}
