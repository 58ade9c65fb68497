//! Request worker pool subsystem.
//!
//! # Data Flow
//! ```text
//! Request accepted on a connection
//!     → worker.rs (submit: queued until a worker slot is free)
//!     → tracker.rs (queued / active accounting, quiescence notification)
//!     → handler runs to completion
//!
//! Pool states:
//!     Running → ShuttingDown → Terminated
//! ```
//!
//! # Design Decisions
//! - Shutdown rejects new work but never aborts work already submitted
//! - The shutdown path sees pools only through [`DrainablePool`]

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

pub mod tracker;
pub mod worker;

pub use tracker::TaskTracker;
pub use worker::WorkerPool;

/// Lifecycle state of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Accepting and executing tasks.
    Running,
    /// New submissions are rejected; submitted tasks keep running.
    ShuttingDown,
    /// Shut down and every submitted task has finished.
    Terminated,
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PoolState::Running => "running",
            PoolState::ShuttingDown => "shutting down",
            PoolState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Error type for pool operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// The pool no longer accepts work.
    #[error("task rejected: pool is {state}")]
    Rejected { state: PoolState },
}

/// The capabilities graceful shutdown needs from a pool.
#[async_trait]
pub trait DrainablePool: Send + Sync {
    /// Stop accepting new work. Idempotent.
    fn shutdown(&self);

    /// Number of tasks currently executing.
    fn active_count(&self) -> usize;

    /// Tasks submitted but still waiting for a worker.
    fn queued_count(&self) -> usize {
        0
    }

    fn state(&self) -> PoolState;

    fn is_terminated(&self) -> bool {
        self.state() == PoolState::Terminated
    }

    /// Wait up to `timeout` for every submitted task to finish.
    ///
    /// Returns true as soon as the pool is quiescent, false if the timeout
    /// elapsed first.
    async fn await_quiescence(&self, timeout: Duration) -> bool;
}
