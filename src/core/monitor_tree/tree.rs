//! Facade owning one monitoring tree and its bookkeeping.

use std::sync::Arc;
use std::time::Duration;

use super::container::ContainerNode;
use super::lifecycle::NodeCounter;
use super::node::{Node, NodeFactory, TreeContext, DEFAULT_CHECK_INTERVAL};
use super::resource::{ResourceDescriptor, ResourceSource};
use crate::core::alert_level::AlertLevel;
use crate::error::Result;

/// Settings for a new tree
#[derive(Clone)]
pub struct TreeOptions {
    /// Runtime for leaf probes; `None` means leaves are fed manually
    pub probes: Option<tokio::runtime::Handle>,
    pub check_interval: Duration,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            probes: None,
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }
}

pub struct MonitorTree {
    counter: Arc<NodeCounter>,
    root: Arc<ContainerNode>,
}

impl MonitorTree {
    pub fn new(
        root: ResourceDescriptor,
        source: Arc<dyn ResourceSource>,
        factory: Arc<dyn NodeFactory>,
        options: TreeOptions,
    ) -> Self {
        let counter = Arc::new(NodeCounter::new());

        let mut context =
            TreeContext::new(counter.clone()).with_check_interval(options.check_interval);
        if let Some(handle) = options.probes {
            context = context.with_probes(handle);
        }

        let root = ContainerNode::root(Arc::new(context), root, source, factory);
        Self { counter, root }
    }

    pub fn start(&self) -> Result<()> {
        log::info!("Starting monitoring tree {}", self.root.core().key());
        self.root.start()
    }

    /// Stop the whole tree; blocks until every probe has exited
    pub fn stop(&self) {
        log::info!("Stopping monitoring tree {}", self.root.core().key());
        self.root.stop();
    }

    pub fn root(&self) -> &Arc<ContainerNode> {
        &self.root
    }

    pub fn root_node(&self) -> Node {
        Node::Container(Arc::clone(&self.root))
    }

    pub fn level(&self) -> AlertLevel {
        self.root.current_level()
    }

    pub fn counter(&self) -> &NodeCounter {
        &self.counter
    }

    /// All nodes below the root, depth first
    pub fn descendants(&self) -> Vec<Node> {
        let mut nodes = Vec::new();
        let mut stack: Vec<Node> = self.root.children().into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            stack.extend(node.children().into_iter().rev());
            nodes.push(node);
        }
        nodes
    }
}
