//! Container nodes, whose children mirror a live resource collection.
//!
//! Locking:
//! - `pass` is held for a whole reconciliation pass, including starting and
//!   stopping children. Pass locks are only ever taken parent before child.
//! - `aggregate` serialises level recomputation. It is taken child before
//!   parent and never while waiting on a pass lock.
//! - `published` is the last consistent child list; it is swapped in one
//!   write at the end of a pass so readers never see half a pass.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use super::node::{Node, NodeCore, NodeFactory, TreeContext};
use super::reconciler::{self, PassSummary};
use super::resource::{ResourceDescriptor, ResourceSource, Subscription};
use crate::core::alert_level::AlertLevel;
use crate::error::{FleetError, Result};

pub struct ContainerNode {
    core: NodeCore,
    source: Arc<dyn ResourceSource>,
    factory: Arc<dyn NodeFactory>,
    pass: Mutex<Vec<Node>>,
    published: RwLock<Vec<Node>>,
    aggregate: Mutex<()>,
    pending: AtomicBool,
    subscription: Mutex<Option<Subscription>>,
}

impl ContainerNode {
    /// Top of a tree; it has no parent to report to.
    pub fn root(
        context: Arc<TreeContext>,
        resource: ResourceDescriptor,
        source: Arc<dyn ResourceSource>,
        factory: Arc<dyn NodeFactory>,
    ) -> Arc<Self> {
        Self::build(NodeCore::new(resource, Weak::new(), context), source, factory)
    }

    pub fn new(
        parent: &Arc<ContainerNode>,
        resource: ResourceDescriptor,
        source: Arc<dyn ResourceSource>,
        factory: Arc<dyn NodeFactory>,
    ) -> Arc<Self> {
        let context = Arc::clone(parent.core().context());
        Self::build(
            NodeCore::new(resource, Arc::downgrade(parent), context),
            source,
            factory,
        )
    }

    fn build(
        core: NodeCore,
        source: Arc<dyn ResourceSource>,
        factory: Arc<dyn NodeFactory>,
    ) -> Arc<Self> {
        Arc::new(Self {
            core,
            source,
            factory,
            pass: Mutex::new(Vec::new()),
            published: RwLock::new(Vec::new()),
            aggregate: Mutex::new(()),
            pending: AtomicBool::new(false),
            subscription: Mutex::new(None),
        })
    }

    pub fn into_node(self: Arc<Self>) -> Node {
        Node::Container(self)
    }

    pub fn core(&self) -> &NodeCore {
        &self.core
    }

    pub fn current_level(&self) -> AlertLevel {
        self.core.level()
    }

    /// Children as of the last completed pass
    pub fn children(&self) -> Vec<Node> {
        self.published.read().clone()
    }

    pub fn child_count(&self) -> usize {
        self.published.read().len()
    }

    /// Subscribe to the source and build the initial children.
    ///
    /// Children exist when this returns, unless the first snapshot could not
    /// be fetched. Starting twice, or after a stop, is an invalid-state error.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        self.core.begin_start()?;

        let node: Weak<ContainerNode> = Arc::downgrade(self);
        let subscription = self.source.subscribe(Arc::new(move || match node.upgrade() {
            Some(node) => node.on_change(),
            None => Ok(()),
        }));
        *self.subscription.lock() = Some(subscription);
        log::debug!("Container {} subscribed", self.core.key());

        match self.reconcile() {
            Ok(_) => Ok(()),
            // Stays linked and subscribed with no children; the source's
            // next notification fills it in
            Err(FleetError::Fetch(reason)) => {
                log::warn!(
                    "Container {} started without children: {}",
                    self.core.key(),
                    reason
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Unsubscribe, then stop and unlink every child.
    ///
    /// Idempotent. Once this returns no notification work runs for this node
    /// and every probe below it has exited.
    pub fn stop(&self) {
        if !self.core.begin_stop() {
            return;
        }

        let subscription = self.subscription.lock().take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }

        {
            let mut children = self.pass.lock();
            let lifecycle = self.core.context().lifecycle();
            for child in children.drain(..) {
                child.stop();
                lifecycle.node_removed();
            }
            self.published.write().clear();
        }

        self.recompute();
        log::debug!("Container {} stopped", self.core.key());
    }

    /// Run one reconciliation pass now, waiting for any pass in progress.
    pub fn reconcile(self: &Arc<Self>) -> Result<PassSummary> {
        if !self.core.is_started() {
            return Err(FleetError::invalid_state(format!(
                "container {} is not running",
                self.core.key()
            )));
        }

        let result = {
            let mut children = self.pass.lock();
            self.pending.store(false, Ordering::SeqCst);
            self.run_pass(&mut children)
        };
        // Notifications that arrived during the pass were left to us
        let drained = self.drain_pending();

        let summary = result?;
        drained?;
        Ok(summary)
    }

    /// Set the level to the maximum of the children's cached levels and
    /// propagate upwards if it changed.
    pub fn recompute(&self) {
        let changed = {
            let _serial = self.aggregate.lock();
            let level = AlertLevel::max_of(self.published.read().iter().map(Node::current_level));
            self.core.set_level(level)
        };

        if changed {
            log::debug!("{} is now {}", self.core.key(), self.core.level());
            if let Some(parent) = self.core.parent() {
                parent.recompute();
            }
        }
    }

    fn on_change(self: &Arc<Self>) -> Result<()> {
        self.pending.store(true, Ordering::SeqCst);
        match self.drain_pending() {
            // Logged already; the next notification retries
            Err(FleetError::Fetch(_)) => Ok(()),
            other => other,
        }
    }

    /// Run passes while notifications are pending, unless another thread
    /// holds the pass lock, in which case that thread picks them up.
    fn drain_pending(self: &Arc<Self>) -> Result<()> {
        let mut outcome = Ok(());

        loop {
            let Some(mut children) = self.pass.try_lock() else {
                return outcome;
            };
            while self.pending.swap(false, Ordering::SeqCst) {
                if let Err(e) = self.run_pass(&mut children) {
                    if outcome.is_ok() {
                        outcome = Err(e);
                    }
                }
            }
            drop(children);

            if !self.pending.load(Ordering::SeqCst) {
                return outcome;
            }
        }
    }

    fn run_pass(self: &Arc<Self>, children: &mut Vec<Node>) -> Result<PassSummary> {
        if !self.core.is_started() {
            return Ok(PassSummary::default());
        }

        let snapshot = self.source.snapshot().inspect_err(|e| {
            log::warn!("Keeping children of {} unchanged: {}", self.core.key(), e);
        })?;

        let current: Vec<ResourceDescriptor> =
            children.iter().map(|child| child.resource().clone()).collect();
        let plan = reconciler::plan(&current, &snapshot);
        if plan.is_noop() {
            return Ok(PassSummary::default());
        }

        let outcome = reconciler::apply(self, self.factory.as_ref(), children, &snapshot, &plan);
        *self.published.write() = children.clone();
        self.recompute();

        match &outcome {
            Ok(summary) => log::debug!(
                "Reconciled {}: +{} -{}",
                self.core.key(),
                summary.added,
                summary.removed
            ),
            Err(e) => log::warn!("Reconciling {} stopped early: {}", self.core.key(), e),
        }
        outcome
    }
}
