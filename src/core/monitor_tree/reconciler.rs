//! Diffing a container's children against a fresh snapshot of its source.
//!
//! Planning is pure and works on descriptors only; applying a plan stops,
//! starts and links real nodes and must run under the container's pass lock.
//!
//! Matching rules:
//! 1. A child survives when the snapshot still holds a resource with the same
//!    key *and* the same display name. A renamed resource invalidates the
//!    child instead of being patched in place.
//! 2. Removals are applied first.
//! 3. The snapshot is then walked by position: a resource counts as present
//!    only when the child at that exact index has its key. Otherwise a fresh
//!    child is inserted there.
//! 4. Children pushed past the end of the snapshot by those inserts are
//!    removed, so the children always end up in snapshot order. Reordering is
//!    therefore paid for with re-creation, never with moves.

use std::sync::Arc;

use super::container::ContainerNode;
use super::node::{Node, NodeFactory};
use super::resource::{ResourceDescriptor, ResourceKey};
use crate::error::{FleetError, Result};

/// Structural changes needed to bring children in line with a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Indices into the current children, ascending
    pub removals: Vec<usize>,
    /// Snapshot positions that receive a new child, in application order
    pub insertions: Vec<usize>,
    /// Children left beyond the snapshot's length once inserts are done
    pub trailing: usize,
}

impl ReconcilePlan {
    pub fn is_noop(&self) -> bool {
        self.removals.is_empty() && self.insertions.is_empty() && self.trailing == 0
    }
}

/// Net structural effect of one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub added: usize,
    pub removed: usize,
}

impl PassSummary {
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

/// Compute the plan for `current` children (by their remembered resource)
pub fn plan(current: &[ResourceDescriptor], snapshot: &[ResourceDescriptor]) -> ReconcilePlan {
    let removals: Vec<usize> = current
        .iter()
        .enumerate()
        .filter(|(_, child)| {
            !snapshot
                .iter()
                .any(|resource| resource.key == child.key && resource.name == child.name)
        })
        .map(|(index, _)| index)
        .collect();

    let mut keys: Vec<&ResourceKey> = current
        .iter()
        .enumerate()
        .filter(|(index, _)| removals.binary_search(index).is_err())
        .map(|(_, child)| &child.key)
        .collect();

    let mut insertions = Vec::new();
    for (index, resource) in snapshot.iter().enumerate() {
        if keys.get(index) != Some(&&resource.key) {
            keys.insert(index, &resource.key);
            insertions.push(index);
        }
    }

    // Every snapshot index is filled above, so keys is at least as long
    let trailing = keys.len() - snapshot.len();

    ReconcilePlan {
        removals,
        insertions,
        trailing,
    }
}

/// Apply `plan` to `children`, reporting each link and unlink to the tree.
///
/// On a failed insert the removals already done stay applied, the failing
/// child is stopped and unlinked, and the error is returned.
pub(crate) fn apply(
    parent: &Arc<ContainerNode>,
    factory: &dyn NodeFactory,
    children: &mut Vec<Node>,
    snapshot: &[ResourceDescriptor],
    plan: &ReconcilePlan,
) -> Result<PassSummary> {
    let lifecycle = parent.core().context().lifecycle();
    let mut summary = PassSummary::default();

    for &index in plan.removals.iter().rev() {
        let child = &children[index];
        log::debug!("Removing {} from {}", child.key(), parent.core().key());
        child.stop();
        children.remove(index);
        lifecycle.node_removed();
        summary.removed += 1;
    }

    for &index in &plan.insertions {
        let resource = &snapshot[index];
        let child = factory
            .create(parent, resource)
            .map_err(|e| FleetError::child_start(resource.key.clone(), e))?;

        children.insert(index, child.clone());
        if let Err(e) = child.start() {
            child.stop();
            children.remove(index);
            return Err(FleetError::child_start(resource.key.clone(), e));
        }

        log::debug!("Added {} to {} at {}", resource.key, parent.core().key(), index);
        lifecycle.node_added();
        summary.added += 1;
    }

    while children.len() > snapshot.len() {
        if let Some(child) = children.last() {
            log::debug!("Dropping displaced {} from {}", child.key(), parent.core().key());
            child.stop();
        }
        children.pop();
        lifecycle.node_removed();
        summary.removed += 1;
    }

    Ok(summary)
}
