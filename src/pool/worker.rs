//! Bounded worker pool for request handling.
//!
//! # Responsibilities
//! - Run submitted futures with at most `max_workers` executing at once
//! - Queue submissions while every worker is busy
//! - Reject submissions once shut down, letting submitted work finish

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::observability::metrics;
use crate::pool::tracker::TaskTracker;
use crate::pool::{DrainablePool, PoolError, PoolState};

/// A bounded pool of Tokio tasks.
#[derive(Debug)]
pub struct WorkerPool {
    name: String,
    /// Worker slots; a task holds one permit while executing.
    workers: Arc<Semaphore>,
    max_workers: usize,
    /// Running or ShuttingDown. Terminated is derived from the tracker.
    state: Mutex<PoolState>,
    tracker: Arc<TaskTracker>,
}

impl WorkerPool {
    /// Create a pool. `max_workers` must be at least one.
    pub fn new(name: impl Into<String>, max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            name: name.into(),
            workers: Arc::new(Semaphore::new(max_workers)),
            max_workers,
            state: Mutex::new(PoolState::Running),
            tracker: Arc::new(TaskTracker::new()),
        }
    }

    /// Submit a task for execution.
    ///
    /// The task is spawned immediately and waits for a free worker before
    /// running. Fails once [`DrainablePool::shutdown`] has been called.
    pub fn submit<F>(&self, task: F) -> Result<(), PoolError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let queued = {
            let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state != PoolState::Running {
                let current = self.state_from(*state);
                metrics::record_rejected();
                tracing::debug!(pool = %self.name, state = %current, "Task rejected");
                return Err(PoolError::Rejected { state: current });
            }
            // Counted under the state lock so shutdown never misses it.
            self.tracker.enqueue()
        };

        let workers = Arc::clone(&self.workers);
        tokio::spawn(async move {
            let Ok(_permit) = workers.acquire_owned().await else {
                return;
            };
            let _active = queued.start();
            task.await;
        });
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Queued plus executing tasks.
    pub fn outstanding(&self) -> usize {
        self.tracker.outstanding()
    }

    fn state_from(&self, stored: PoolState) -> PoolState {
        if stored == PoolState::ShuttingDown && self.tracker.outstanding() == 0 {
            PoolState::Terminated
        } else {
            stored
        }
    }
}

#[async_trait]
impl DrainablePool for WorkerPool {
    fn shutdown(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == PoolState::Running {
            *state = PoolState::ShuttingDown;
            tracing::info!(
                pool = %self.name,
                outstanding = self.tracker.outstanding(),
                "Worker pool no longer accepting tasks"
            );
        }
    }

    fn active_count(&self) -> usize {
        self.tracker.active_count()
    }

    fn queued_count(&self) -> usize {
        self.tracker
            .outstanding()
            .saturating_sub(self.tracker.active_count())
    }

    fn state(&self) -> PoolState {
        let stored = *self.state.lock().unwrap_or_else(PoisonError::into_inner);
        self.state_from(stored)
    }

    async fn await_quiescence(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.tracker.wait_idle())
            .await
            .is_ok()
    }
}
