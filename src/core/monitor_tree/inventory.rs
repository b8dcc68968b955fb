//! In-memory backing collection.
//!
//! Serves as the change source for containers whose children come from a
//! list kept in process, such as the hosts and services of a loaded fleet file.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::resource::{
    ChangeListener, ListenerRegistry, ResourceDescriptor, ResourceKey, ResourceSource,
    Subscription,
};
use crate::error::{FleetError, Result};

/// Thread-safe ordered list of resources with change notification
pub struct Inventory {
    items: RwLock<Vec<ResourceDescriptor>>,
    listeners: Arc<ListenerRegistry>,
    reachable: AtomicBool,
}

impl Inventory {
    pub fn new() -> Self {
        Self::with_items(Vec::new())
    }

    pub fn with_items(items: Vec<ResourceDescriptor>) -> Self {
        Self {
            items: RwLock::new(items),
            listeners: ListenerRegistry::new(),
            reachable: AtomicBool::new(true),
        }
    }

    pub fn items(&self) -> Vec<ResourceDescriptor> {
        self.items.read().clone()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    /// Replace the whole contents. Subscribers are notified only on change.
    pub fn replace(&self, items: Vec<ResourceDescriptor>) -> Result<()> {
        self.mutate(|current| {
            if *current == items {
                false
            } else {
                *current = items;
                true
            }
        })
    }

    pub fn push(&self, item: ResourceDescriptor) -> Result<()> {
        self.mutate(|current| {
            current.push(item);
            true
        })
    }

    /// Remove every entry with `key`
    pub fn remove(&self, key: &ResourceKey) -> Result<()> {
        self.mutate(|current| {
            let before = current.len();
            current.retain(|item| &item.key != key);
            current.len() != before
        })
    }

    /// Change the display name of every entry with `key`
    pub fn rename(&self, key: &ResourceKey, name: Option<String>) -> Result<()> {
        self.mutate(|current| {
            let mut changed = false;
            for item in current.iter_mut().filter(|item| &item.key == key) {
                if item.name != name {
                    item.name = name.clone();
                    changed = true;
                }
            }
            changed
        })
    }

    /// Simulate an unreachable provider: snapshots fail until set back.
    ///
    /// Becoming reachable again notifies subscribers so they catch up.
    pub fn set_reachable(&self, reachable: bool) -> Result<()> {
        let was = self.reachable.swap(reachable, Ordering::SeqCst);
        if reachable && !was {
            return self.listeners.notify();
        }
        Ok(())
    }

    fn mutate<F>(&self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<ResourceDescriptor>) -> bool,
    {
        let changed = {
            let mut items = self.items.write();
            apply(&mut items)
        };

        // Listeners re-fetch, so the write lock must be released first
        if changed {
            self.listeners.notify()
        } else {
            Ok(())
        }
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceSource for Inventory {
    fn snapshot(&self) -> Result<Vec<ResourceDescriptor>> {
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(FleetError::fetch("inventory is unreachable"));
        }
        Ok(self.items())
    }

    fn subscribe(&self, listener: ChangeListener) -> Subscription {
        self.listeners.register(listener)
    }
}
