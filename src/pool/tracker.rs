//! Task accounting for the worker pool.
//!
//! # Responsibilities
//! - Count outstanding tasks (queued or running)
//! - Count active tasks (holding a worker slot)
//! - Wake drain waiters when the pool goes quiet

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::observability::metrics;

/// Tracks tasks submitted to a pool.
///
/// Uses a watch channel so waiters observe the outstanding count reaching zero
/// without polling.
#[derive(Debug)]
pub struct TaskTracker {
    /// Tasks currently executing.
    active: AtomicUsize,
    /// Queued plus executing tasks.
    outstanding: watch::Sender<usize>,
}

impl TaskTracker {
    pub fn new() -> Self {
        let (outstanding, _) = watch::channel(0);
        Self {
            active: AtomicUsize::new(0),
            outstanding,
        }
    }

    /// Record a newly submitted task. The returned guard keeps it outstanding
    /// until dropped.
    pub fn enqueue(self: &Arc<Self>) -> QueuedGuard {
        self.outstanding.send_modify(|n| *n += 1);
        QueuedGuard {
            tracker: Arc::clone(self),
        }
    }

    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn outstanding(&self) -> usize {
        *self.outstanding.borrow()
    }

    /// Wait until no task is outstanding.
    pub async fn wait_idle(&self) {
        let mut rx = self.outstanding.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

impl Default for TaskTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard held from submission until the task finishes or is discarded.
#[derive(Debug)]
pub struct QueuedGuard {
    tracker: Arc<TaskTracker>,
}

impl QueuedGuard {
    /// Mark the task as holding a worker. Returns a guard that decrements the
    /// active count on drop.
    pub fn start(&self) -> ActiveGuard {
        let active = self.tracker.active.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::set_pool_active(active);
        ActiveGuard {
            tracker: Arc::clone(&self.tracker),
        }
    }
}

impl Drop for QueuedGuard {
    fn drop(&mut self) {
        self.tracker.outstanding.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Guard for a task while it executes.
#[derive(Debug)]
pub struct ActiveGuard {
    tracker: Arc<TaskTracker>,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        let active = self.tracker.active.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_pool_active(active);
        tracing::trace!(active, "Task finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_follow_guards() {
        let tracker = Arc::new(TaskTracker::new());
        assert_eq!(tracker.outstanding(), 0);

        let queued1 = tracker.enqueue();
        let queued2 = tracker.enqueue();
        assert_eq!(tracker.outstanding(), 2);
        assert_eq!(tracker.active_count(), 0);

        let active = queued1.start();
        assert_eq!(tracker.active_count(), 1);

        drop(active);
        drop(queued1);
        assert_eq!(tracker.active_count(), 0);
        assert_eq!(tracker.outstanding(), 1);

        drop(queued2);
        assert_eq!(tracker.outstanding(), 0);
    }

    #[tokio::test]
    async fn wait_idle_returns_once_outstanding_drops_to_zero() {
        let tracker = Arc::new(TaskTracker::new());
        let queued = tracker.enqueue();

        let waiter = {
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move { tracker.wait_idle().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(queued);
        waiter.await.unwrap();
    }
}
