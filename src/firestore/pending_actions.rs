//! In-flight write tracking
//!
//! A write is counted from the moment the underlying client accepts it until
//! it settles. The count is held by a [`PendingAction`] guard, so every exit
//! path (success, failure, a dropped future, an aborted task) releases it
//! exactly once.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Snapshot of the in-flight write count, as reported to the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingActions {
    /// Writes dispatched but not yet resolved or failed
    pub count: usize,
}

/// Counter of in-flight writes for one client lifetime
///
/// Clones share the same count.
#[derive(Debug, Clone, Default)]
pub struct PendingActionCounter {
    count: Arc<AtomicUsize>,
}

impl PendingActionCounter {
    /// Create a counter at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one write until the returned guard is dropped
    #[must_use = "the write is only counted while the guard is alive"]
    pub fn acquire(&self) -> PendingAction {
        self.count.fetch_add(1, Ordering::SeqCst);
        PendingAction {
            count: Arc::clone(&self.count),
        }
    }

    /// Current number of in-flight writes
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Current count in wire form
    pub fn snapshot(&self) -> PendingActions {
        PendingActions {
            count: self.count(),
        }
    }
}

/// One counted in-flight write
///
/// Dropping the guard releases the count.
#[derive(Debug)]
pub struct PendingAction {
    count: Arc<AtomicUsize>,
}

impl Drop for PendingAction {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_brackets_count() {
        let counter = PendingActionCounter::new();
        assert_eq!(counter.count(), 0);

        let first = counter.acquire();
        let second = counter.acquire();
        assert_eq!(counter.count(), 2);

        drop(first);
        assert_eq!(counter.count(), 1);
        drop(second);
        assert_eq!(counter.snapshot(), PendingActions { count: 0 });
    }

    #[test]
    fn test_clones_share_count() {
        let counter = PendingActionCounter::new();
        let clone = counter.clone();

        let _guard = clone.acquire();
        assert_eq!(counter.count(), 1);
    }

    #[tokio::test]
    async fn test_guard_released_when_task_aborted() {
        let counter = PendingActionCounter::new();
        let guard = counter.acquire();

        let task = tokio::spawn(async move {
            let _guard = guard;
            std::future::pending::<()>().await;
        });
        assert_eq!(counter.count(), 1);

        task.abort();
        let _ = task.await;
        assert_eq!(counter.count(), 0);
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(PendingActions { count: 3 }).unwrap();
        assert_eq!(json, serde_json::json!({"count": 3}));
    }
}
