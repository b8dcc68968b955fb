//! Backing resources mirrored by the tree and the change-source contract.

use parking_lot::{Mutex, ReentrantMutex};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crate::error::Result;

/// Stable identity of a backing resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceKey(String);

impl ResourceKey {
    pub fn new<S: Into<String>>(key: S) -> Self {
        ResourceKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceKey {
    fn from(key: &str) -> Self {
        ResourceKey::new(key)
    }
}

impl From<String> for ResourceKey {
    fn from(key: String) -> Self {
        ResourceKey(key)
    }
}

/// One entry of a backing-collection snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub key: ResourceKey,
    #[serde(default)]
    pub name: Option<String>,
}

impl ResourceDescriptor {
    pub fn new<K: Into<ResourceKey>>(key: K) -> Self {
        Self {
            key: key.into(),
            name: None,
        }
    }

    pub fn named<K: Into<ResourceKey>, S: Into<String>>(key: K, name: S) -> Self {
        Self {
            key: key.into(),
            name: Some(name.into()),
        }
    }

    /// Label shown for the resource, falling back to its key
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.key.as_str())
    }
}

/// Callback fired when a source changed and should be re-fetched.
///
/// An error returned here is handed back to whoever triggered the notification.
pub type ChangeListener = Arc<dyn Fn() -> Result<()> + Send + Sync>;

/// Handle to an active listener registration.
///
/// Unsubscribing is synchronous: once `unsubscribe` returns (or the handle is
/// dropped) no invocation of the listener is running and none will start.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// `cancel` must honour the synchronous-unsubscribe contract above.
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// External, mutable, ordered collection a container mirrors
pub trait ResourceSource: Send + Sync {
    /// Fetch the current ordered contents in one atomic read.
    fn snapshot(&self) -> Result<Vec<ResourceDescriptor>>;

    /// Register for "something changed, re-fetch" notifications.
    fn subscribe(&self, listener: ChangeListener) -> Subscription;
}

struct ListenerSlot {
    id: u64,
    listener: ChangeListener,
    // Held for the whole invocation, reentrant so a listener that triggers
    // another notification on the same thread does not deadlock.
    gate: ReentrantMutex<Cell<bool>>,
}

/// Subscribe/notify bookkeeping for change sources.
pub struct ListenerRegistry {
    next_id: AtomicU64,
    slots: Mutex<Vec<Arc<ListenerSlot>>>,
}

impl ListenerRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(0),
            slots: Mutex::new(Vec::new()),
        })
    }

    pub fn register(self: &Arc<Self>, listener: ChangeListener) -> Subscription {
        let slot = Arc::new(ListenerSlot {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            listener,
            gate: ReentrantMutex::new(Cell::new(true)),
        });
        self.slots.lock().push(Arc::clone(&slot));

        let registry: Weak<ListenerRegistry> = Arc::downgrade(self);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.slots.lock().retain(|s| s.id != slot.id);
            }
            // Waits for an in-flight invocation of this listener to finish
            let gate = slot.gate.lock();
            gate.set(false);
        })
    }

    /// Invoke every active listener; returns the first error after all ran.
    pub fn notify(&self) -> Result<()> {
        let slots: Vec<Arc<ListenerSlot>> = self.slots.lock().clone();
        let mut outcome = Ok(());

        for slot in slots {
            let gate = slot.gate.lock();
            if !gate.get() {
                continue;
            }
            if let Err(e) = (slot.listener)() {
                log::warn!("Change listener failed: {}", e);
                if outcome.is_ok() {
                    outcome = Err(e);
                }
            }
        }

        outcome
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
