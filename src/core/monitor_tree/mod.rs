//! Incremental monitoring tree.
//!
//! Containers keep their children in step with a live resource collection,
//! preserving node identity across updates, and every ancestor carries the
//! maximum alert level found below it.

mod container;
mod inventory;
mod leaf;
mod lifecycle;
mod node;
mod persistence;
mod probe;
pub mod reconciler;
mod resource;
mod tree;

pub use container::ContainerNode;
pub use inventory::Inventory;
pub use leaf::{CheckResult, LeafNode, LeafStatus, Worker};
pub use lifecycle::{Lifecycle, LifecycleSink, NodeCounter};
pub use node::{Node, NodeCore, NodeFactory, TreeContext, DEFAULT_CHECK_INTERVAL};
pub use persistence::StateDirs;
pub use probe::WorkerRuntime;
pub use reconciler::{PassSummary, ReconcilePlan};
pub use resource::{
    ChangeListener, ListenerRegistry, ResourceDescriptor, ResourceKey, ResourceSource,
    Subscription,
};
pub use tree::{MonitorTree, TreeOptions};
