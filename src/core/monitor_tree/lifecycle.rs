//! Tree-wide structural bookkeeping.

use std::sync::atomic::{AtomicU64, Ordering};

/// Receiver of structural changes, one call per node linked or unlinked.
///
/// Called concurrently from any subtree.
pub trait LifecycleSink: Send + Sync {
    fn node_added(&self);
    fn node_removed(&self);
}

/// Lifecycle state of a single node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Unstarted,
    Started,
    /// Terminal
    Stopped,
}

/// Process-wide node counter injected into a tree
#[derive(Debug, Default)]
pub struct NodeCounter {
    added: AtomicU64,
    removed: AtomicU64,
}

impl NodeCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total `node_added` calls so far
    pub fn added(&self) -> u64 {
        self.added.load(Ordering::SeqCst)
    }

    /// Total `node_removed` calls so far
    pub fn removed(&self) -> u64 {
        self.removed.load(Ordering::SeqCst)
    }

    /// Nodes currently linked below the root
    pub fn live(&self) -> u64 {
        // Read removed first so a concurrent add never makes this underflow
        let removed = self.removed();
        self.added().saturating_sub(removed)
    }
}

impl LifecycleSink for NodeCounter {
    fn node_added(&self) {
        self.added.fetch_add(1, Ordering::SeqCst);
    }

    fn node_removed(&self) {
        self.removed.fetch_add(1, Ordering::SeqCst);
    }
}
