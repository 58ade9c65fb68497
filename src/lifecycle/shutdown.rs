//! Graceful shutdown coordination.
//!
//! # Sequence
//! ```text
//! closing event
//!     → pause listener (no new connections delivered)
//!     → shut down worker pool (no new requests accepted)
//!     → drain: poll for quiescence every poll interval, up to the timeout
//!     → escalate: log what is still running, never abort it
//! ```

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;

use crate::config::ShutdownConfig;
use crate::lifecycle::hooks::ShutdownHook;
use crate::lifecycle::signals::LifecycleSignal;
use crate::lifecycle::ShutdownError;
use crate::net::{ListenerBinder, ListenerHandle};
use crate::observability::metrics;
use crate::pool::DrainablePool;

/// How a shutdown sequence ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// No listener was ever bound.
    NoListener,
    /// The listener runs requests without a managed pool.
    NothingToDrain,
    /// Every task finished within the timeout.
    Terminated,
    /// The timeout elapsed with `active` tasks still running.
    ForceTerminated { active: usize },
}

impl DrainOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrainOutcome::NoListener => "no_listener",
            DrainOutcome::NothingToDrain => "nothing_to_drain",
            DrainOutcome::Terminated => "terminated",
            DrainOutcome::ForceTerminated { .. } => "force_terminated",
        }
    }
}

/// Progress of a drain in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainState {
    /// Budget left before escalation.
    pub remaining: Duration,
    /// Active tasks at the last poll.
    pub active_count: usize,
}

/// Wait for `pool` to go quiet, polling every `config.poll_interval()` for at
/// most `config.timeout()`.
///
/// Tasks still running at the end are reported, not cancelled. If `interrupt`
/// fires during a wait the drain is abandoned and the interruption returned.
pub async fn drain(
    pool: &dyn DrainablePool,
    config: &ShutdownConfig,
    interrupt: &LifecycleSignal,
) -> Result<DrainOutcome, ShutdownError> {
    if pool.is_terminated() {
        tracing::info!("Worker pool already terminated");
        return Ok(DrainOutcome::Terminated);
    }

    let poll_interval = config.poll_interval();
    let mut state = DrainState {
        remaining: config.timeout(),
        active_count: pool.active_count(),
    };
    tracing::info!(
        active = state.active_count,
        state = %pool.state(),
        timeout_secs = config.timeout_secs,
        poll_interval_secs = config.poll_interval_secs,
        "Awaiting worker pool drain"
    );

    let mut interrupted = interrupt.subscribe();
    while !state.remaining.is_zero() {
        let wait = state.remaining.min(poll_interval);
        let quiescent = tokio::select! {
            biased;
            quiescent = pool.await_quiescence(wait) => quiescent,
            _ = interrupted.recv() => {
                tracing::warn!(
                    active = pool.active_count(),
                    remaining_secs = state.remaining.as_secs(),
                    "Drain interrupted"
                );
                return Err(ShutdownError::Interrupted { phase: "draining worker pool" });
            }
        };

        if quiescent {
            tracing::info!("Shutdown finished, worker pool drained");
            return Ok(DrainOutcome::Terminated);
        }

        state.remaining = state.remaining.saturating_sub(poll_interval);
        state.active_count = pool.active_count();
        tracing::info!(
            active = state.active_count,
            remaining_secs = state.remaining.as_secs(),
            "Shutdown in progress"
        );
    }

    state.active_count = pool.active_count();
    if state.active_count > 0 {
        tracing::warn!(
            active = state.active_count,
            "Task(s) still active after grace period, force shutdown"
        );
        Ok(DrainOutcome::ForceTerminated {
            active: state.active_count,
        })
    } else {
        let queued = pool.queued_count();
        if queued > 0 {
            tracing::warn!(
                queued,
                state = %pool.state(),
                "Grace period over with tasks still queued, none executing"
            );
        }
        Ok(DrainOutcome::Terminated)
    }
}

/// Pauses the listener and drains its worker pool when the application
/// closes.
pub struct ShutdownCoordinator {
    application_name: String,
    config: ShutdownConfig,
    listener: ArcSwapOption<ListenerHandle>,
}

impl ShutdownCoordinator {
    pub fn new(application_name: impl Into<String>, config: ShutdownConfig) -> Self {
        Self {
            application_name: application_name.into(),
            config,
            listener: ArcSwapOption::empty(),
        }
    }

    pub fn config(&self) -> &ShutdownConfig {
        &self.config
    }

    /// The listener recorded by [`ListenerBinder::on_bind`], if any.
    pub fn listener(&self) -> Option<ListenerHandle> {
        self.listener.load_full().map(|handle| (*handle).clone())
    }

    /// Run the shutdown sequence.
    ///
    /// Only an interruption is returned as an error; missing listener or pool
    /// and an exhausted timeout are reported through the outcome.
    pub async fn on_shutdown_signal(
        &self,
        interrupt: &LifecycleSignal,
    ) -> Result<DrainOutcome, ShutdownError> {
        let outcome = self.shutdown_sequence(interrupt).await?;
        metrics::record_drain(outcome.as_str());
        Ok(outcome)
    }

    async fn shutdown_sequence(
        &self,
        interrupt: &LifecycleSignal,
    ) -> Result<DrainOutcome, ShutdownError> {
        let Some(listener) = self.listener.load_full() else {
            tracing::info!(app = %self.application_name, "No listener bound, nothing to drain");
            return Ok(DrainOutcome::NoListener);
        };

        listener.pause();

        let Some(pool) = listener.worker_pool() else {
            tracing::info!(listener = %listener, "Listener has no managed worker pool, nothing to drain");
            return Ok(DrainOutcome::NothingToDrain);
        };

        tracing::info!(app = %self.application_name, "Gracefully shutting down");
        pool.shutdown();
        drain(pool.as_ref(), &self.config, interrupt).await
    }
}

impl ListenerBinder for ShutdownCoordinator {
    fn on_bind(&self, listener: ListenerHandle) {
        tracing::debug!(listener = %listener, "Listener recorded for graceful shutdown");
        self.listener.store(Some(Arc::new(listener)));
    }
}

#[async_trait]
impl ShutdownHook for ShutdownCoordinator {
    fn name(&self) -> &str {
        "graceful-shutdown"
    }

    async fn on_shutdown(&self, interrupt: &LifecycleSignal) -> Result<(), ShutdownError> {
        self.on_shutdown_signal(interrupt).await.map(|_| ())
    }
}
