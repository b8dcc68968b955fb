//! Nodes of the monitoring tree and the context they share.

use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use super::container::ContainerNode;
use super::leaf::LeafNode;
use super::lifecycle::{Lifecycle, LifecycleSink};
use super::resource::{ResourceDescriptor, ResourceKey};
use crate::core::alert_level::AlertLevel;
use crate::error::{FleetError, Result};

pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Dependencies injected into every node of one tree
pub struct TreeContext {
    lifecycle: Arc<dyn LifecycleSink>,
    probes: Option<tokio::runtime::Handle>,
    check_interval: Duration,
}

impl TreeContext {
    /// Context without a probe runtime: leaves only change through
    /// [`LeafNode::record`].
    pub fn new(lifecycle: Arc<dyn LifecycleSink>) -> Self {
        Self {
            lifecycle,
            probes: None,
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }

    /// Schedule leaf workers on `handle`
    pub fn with_probes(mut self, handle: tokio::runtime::Handle) -> Self {
        self.probes = Some(handle);
        self
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn lifecycle(&self) -> &dyn LifecycleSink {
        self.lifecycle.as_ref()
    }

    pub fn probes(&self) -> Option<&tokio::runtime::Handle> {
        self.probes.as_ref()
    }

    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }
}

/// State every node kind carries
pub struct NodeCore {
    resource: ResourceDescriptor,
    parent: Weak<ContainerNode>,
    context: Arc<TreeContext>,
    level: Mutex<AlertLevel>,
    lifecycle: Mutex<Lifecycle>,
}

impl NodeCore {
    pub(crate) fn new(
        resource: ResourceDescriptor,
        parent: Weak<ContainerNode>,
        context: Arc<TreeContext>,
    ) -> Self {
        Self {
            resource,
            parent,
            context,
            level: Mutex::new(AlertLevel::None),
            lifecycle: Mutex::new(Lifecycle::Unstarted),
        }
    }

    pub fn resource(&self) -> &ResourceDescriptor {
        &self.resource
    }

    pub fn key(&self) -> &ResourceKey {
        &self.resource.key
    }

    pub fn context(&self) -> &Arc<TreeContext> {
        &self.context
    }

    /// Cached level, never recomputed here
    pub fn level(&self) -> AlertLevel {
        *self.level.lock()
    }

    /// Store a new level, reporting whether it differs from the cached one
    pub(crate) fn set_level(&self, level: AlertLevel) -> bool {
        let mut current = self.level.lock();
        if *current == level {
            false
        } else {
            *current = level;
            true
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.lock()
    }

    pub fn is_started(&self) -> bool {
        self.lifecycle() == Lifecycle::Started
    }

    pub(crate) fn begin_start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        match *lifecycle {
            Lifecycle::Unstarted => {
                *lifecycle = Lifecycle::Started;
                Ok(())
            }
            Lifecycle::Started => Err(FleetError::invalid_state(format!(
                "node {} is already started",
                self.resource.key
            ))),
            Lifecycle::Stopped => Err(FleetError::invalid_state(format!(
                "node {} was stopped and cannot be restarted",
                self.resource.key
            ))),
        }
    }

    /// Move to `Stopped`; false when the node already was
    pub(crate) fn begin_stop(&self) -> bool {
        let mut lifecycle = self.lifecycle.lock();
        if *lifecycle == Lifecycle::Stopped {
            false
        } else {
            *lifecycle = Lifecycle::Stopped;
            true
        }
    }

    pub fn parent(&self) -> Option<Arc<ContainerNode>> {
        self.parent.upgrade()
    }
}

/// A node of the monitoring tree
#[derive(Clone)]
pub enum Node {
    Leaf(Arc<LeafNode>),
    Container(Arc<ContainerNode>),
}

impl Node {
    fn core(&self) -> &NodeCore {
        match self {
            Node::Leaf(leaf) => leaf.core(),
            Node::Container(container) => container.core(),
        }
    }

    pub fn key(&self) -> &ResourceKey {
        self.core().key()
    }

    pub fn resource(&self) -> &ResourceDescriptor {
        self.core().resource()
    }

    pub fn label(&self) -> &str {
        self.core().resource().display_name()
    }

    pub fn current_level(&self) -> AlertLevel {
        self.core().level()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.core().lifecycle()
    }

    pub fn parent(&self) -> Option<Arc<ContainerNode>> {
        self.core().parent()
    }

    /// Detail message of the last check; containers have none
    pub fn detail(&self) -> Option<String> {
        match self {
            Node::Leaf(leaf) => leaf.status().detail,
            Node::Container(_) => None,
        }
    }

    pub fn children(&self) -> Vec<Node> {
        match self {
            Node::Leaf(_) => Vec::new(),
            Node::Container(container) => container.children(),
        }
    }

    pub fn start(&self) -> Result<()> {
        match self {
            Node::Leaf(leaf) => leaf.start(),
            Node::Container(container) => container.start(),
        }
    }

    /// Idempotent; returns once the whole subtree has stopped
    pub fn stop(&self) {
        match self {
            Node::Leaf(leaf) => leaf.stop(),
            Node::Container(container) => container.stop(),
        }
    }

    /// Keys from the root down to this node
    pub fn path(&self) -> Vec<ResourceKey> {
        let mut path = vec![self.key().clone()];
        let mut parent = self.parent();
        while let Some(node) = parent {
            path.push(node.core().key().clone());
            parent = node.core().parent();
        }
        path.reverse();
        path
    }

    pub fn as_leaf(&self) -> Option<&Arc<LeafNode>> {
        match self {
            Node::Leaf(leaf) => Some(leaf),
            Node::Container(_) => None,
        }
    }

    pub fn as_container(&self) -> Option<&Arc<ContainerNode>> {
        match self {
            Node::Container(container) => Some(container),
            Node::Leaf(_) => None,
        }
    }

    /// Identity comparison, not structural equality
    pub fn same_node(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Leaf(a), Node::Leaf(b)) => Arc::ptr_eq(a, b),
            (Node::Container(a), Node::Container(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Node::Leaf(_) => "Leaf",
            Node::Container(_) => "Container",
        };
        f.debug_struct(kind)
            .field("key", self.key())
            .field("label", &self.label())
            .field("level", &self.current_level())
            .field("lifecycle", &self.lifecycle())
            .finish()
    }
}

/// Builds the node for a resource that just appeared in a container's source
pub trait NodeFactory: Send + Sync {
    fn create(&self, parent: &Arc<ContainerNode>, resource: &ResourceDescriptor) -> Result<Node>;
}
