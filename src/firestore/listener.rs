//! Snapshot listener registry
//!
//! Every live subscription the bridge opens is parked here under a freshly
//! minted [`CallbackId`]. The registry is the only owner of the
//! subscriptions' [`ListenerRegistration`]s: nothing else may cancel them.
//!
//! Cancellation handles are never invoked while the map lock is held, so a
//! listener may remove itself (or any other listener) from inside its own
//! snapshot callback.

use crate::error::{BridgeError, FirestoreError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Opaque identifier of one active snapshot listener
///
/// Unique among the listeners active at the same time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackId(String);

impl CallbackId {
    /// Wrap an id received from the host
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CallbackId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for CallbackId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

type CancelFn = Box<dyn FnOnce() -> Result<(), FirestoreError> + Send>;

/// Handle for removing a snapshot listener
///
/// Wraps the cancellation the underlying client hands out. The cancellation
/// runs at most once: either through [`ListenerRegistration::remove`] or,
/// failing that, when the registration is dropped.
pub struct ListenerRegistration {
    cancel: Option<CancelFn>,
}

impl ListenerRegistration {
    /// Wrap a cancellation function
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() -> Result<(), FirestoreError> + Send + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Registration with nothing to cancel
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    /// Removes the listener and stops receiving updates
    pub fn remove(mut self) -> Result<(), FirestoreError> {
        match self.cancel.take() {
            Some(cancel) => cancel(),
            None => Ok(()),
        }
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            // Dropped without remove(), nobody is left to see the error
            let _ = cancel();
        }
    }
}

impl fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Registry of active snapshot listeners
///
/// Cheap to clone; clones share the same map.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    subscriptions: Mutex<HashMap<CallbackId, ListenerRegistration>>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a subscription and park its registration under a new id
    ///
    /// `factory` receives the id before the entry is visible and runs while
    /// the map is locked, so a subscription can never deliver (and try to
    /// remove itself) before it is registered. The factory must therefore not
    /// call back into this registry. If the factory fails, nothing is stored
    /// and its error is returned unchanged.
    pub fn add<F>(&self, factory: F) -> Result<CallbackId, BridgeError>
    where
        F: FnOnce(&CallbackId) -> Result<ListenerRegistration, BridgeError>,
    {
        let id = self.mint_id();
        let mut subscriptions = self.lock();
        let registration = factory(&id)?;
        subscriptions.insert(id.clone(), registration);
        debug!(callback_id = %id, active = subscriptions.len(), "snapshot listener added");
        Ok(id)
    }

    /// Cancel and forget one listener
    ///
    /// Fails with [`BridgeError::UnknownListener`] when `id` is not active.
    /// The entry is gone even if the cancellation itself reports an error.
    pub fn remove(&self, id: &CallbackId) -> Result<(), BridgeError> {
        let registration = self
            .lock()
            .remove(id)
            .ok_or_else(|| BridgeError::UnknownListener(id.clone()))?;

        registration.remove()?;
        debug!(callback_id = %id, "snapshot listener removed");
        Ok(())
    }

    /// Cancel every listener and empty the registry
    ///
    /// Best effort: a cancellation that errors or panics is logged and the
    /// sweep continues with the remaining listeners.
    pub fn clear_all(&self) {
        let drained: Vec<(CallbackId, ListenerRegistration)> = self.lock().drain().collect();
        let count = drained.len();

        for (id, registration) in drained {
            match panic::catch_unwind(AssertUnwindSafe(|| registration.remove())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(callback_id = %id, error = %e, "failed to cancel snapshot listener");
                }
                Err(_) => {
                    warn!(callback_id = %id, "snapshot listener cancellation panicked");
                }
            }
        }

        debug!(count, "cleared all snapshot listeners");
    }

    /// Whether `id` is currently active
    pub fn contains(&self, id: &CallbackId) -> bool {
        self.lock().contains_key(id)
    }

    /// Number of active listeners
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no listener is active
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn mint_id(&self) -> CallbackId {
        let n = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        CallbackId(n.to_string())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CallbackId, ListenerRegistration>> {
        // A panicking factory poisons the lock but leaves the map consistent
        self.inner
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("active", &self.len())
            .finish()
    }
}
