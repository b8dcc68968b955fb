//! Leaf nodes, whose level comes straight from a health check.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::time::Duration;

use super::container::ContainerNode;
use super::node::{Node, NodeCore};
use super::probe::{self, ProbeHandle};
use super::resource::ResourceDescriptor;
use crate::core::alert_level::AlertLevel;
use crate::error::{FleetError, Result};

/// Outcome of one health check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub level: AlertLevel,
    pub detail: Option<String>,
}

impl CheckResult {
    pub fn new(level: AlertLevel) -> Self {
        Self {
            level,
            detail: None,
        }
    }

    pub fn with_detail<S: Into<String>>(level: AlertLevel, detail: S) -> Self {
        Self {
            level,
            detail: Some(detail.into()),
        }
    }

    /// A check that could not complete degrades to `Unknown`
    pub fn from_error(error: &FleetError) -> Self {
        Self::with_detail(AlertLevel::Unknown, error.to_string())
    }
}

/// Performs the health check behind one leaf
pub trait Worker: Send + Sync {
    /// Errors are absorbed by the leaf and shown as `Unknown`.
    fn check(&self) -> Result<CheckResult>;

    /// Probe period; `None` uses the tree's default check interval
    fn interval(&self) -> Option<Duration> {
        None
    }
}

/// Last recorded check of a leaf
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeafStatus {
    pub level: AlertLevel,
    pub detail: Option<String>,
    pub checked_at: Option<DateTime<Utc>>,
}

pub struct LeafNode {
    core: NodeCore,
    worker: Arc<dyn Worker>,
    status: Mutex<LeafStatus>,
    probe: Mutex<Option<ProbeHandle>>,
}

impl LeafNode {
    pub fn new(
        parent: &Arc<ContainerNode>,
        resource: ResourceDescriptor,
        worker: Arc<dyn Worker>,
    ) -> Arc<Self> {
        let context = Arc::clone(parent.core().context());
        Arc::new(Self {
            core: NodeCore::new(resource, Arc::downgrade(parent), context),
            worker,
            status: Mutex::new(LeafStatus::default()),
            probe: Mutex::new(None),
        })
    }

    pub fn into_node(self: Arc<Self>) -> Node {
        Node::Leaf(self)
    }

    pub fn core(&self) -> &NodeCore {
        &self.core
    }

    pub fn status(&self) -> LeafStatus {
        self.status.lock().clone()
    }

    /// Begin probing. Without a probe runtime the leaf waits for
    /// [`LeafNode::record`] calls instead.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        self.core.begin_start()?;

        if let Some(handle) = self.core.context().probes() {
            let period = self
                .worker
                .interval()
                .unwrap_or_else(|| self.core.context().check_interval());
            let leaf: Weak<LeafNode> = Arc::downgrade(self);
            let probe = probe::spawn_probe(handle, leaf, Arc::clone(&self.worker), period);
            *self.probe.lock() = Some(probe);
        }

        log::debug!("Leaf {} started", self.core.key());
        Ok(())
    }

    /// Stop probing; blocks until the probe task has exited
    pub fn stop(&self) {
        if !self.core.begin_stop() {
            return;
        }

        let probe = self.probe.lock().take();
        if let Some(probe) = probe {
            probe.stop();
        }
        log::debug!("Leaf {} stopped", self.core.key());
    }

    /// Run the worker once on the calling thread and record the outcome
    pub fn check_now(&self) -> AlertLevel {
        let result = match panic::catch_unwind(AssertUnwindSafe(|| self.worker.check())) {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                log::warn!("Check for {} failed: {}", self.core.key(), e);
                CheckResult::from_error(&e)
            }
            Err(payload) => {
                let error = FleetError::worker(format!(
                    "check panicked: {}",
                    panic_message(payload.as_ref())
                ));
                log::warn!("Check for {} failed: {}", self.core.key(), error);
                CheckResult::from_error(&error)
            }
        };
        let level = result.level;
        self.record(result);
        level
    }

    /// Store a check outcome and propagate a level change to the ancestors.
    ///
    /// Ignored unless the leaf is started.
    pub fn record(&self, result: CheckResult) {
        if !self.core.is_started() {
            return;
        }

        let changed = {
            let mut status = self.status.lock();
            status.level = result.level;
            status.detail = result.detail;
            status.checked_at = Some(Utc::now());
            self.core.set_level(result.level)
        };

        if changed {
            log::debug!("{} is now {}", self.core.key(), result.level);
            if let Some(parent) = self.core.parent() {
                parent.recompute();
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
