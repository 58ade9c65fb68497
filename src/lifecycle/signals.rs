//! Process lifecycle signals.
//!
//! # Responsibilities
//! - One-shot lifecycle events that fire at most once per process
//! - Translate SIGTERM/SIGINT into those events
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - First SIGTERM/SIGINT closes the application context
//! - A second SIGTERM/SIGINT interrupts a drain in progress

use std::sync::Arc;

use tokio::signal;
use tokio::sync::watch;

/// A signal that fires at most once.
///
/// Subscribers that arrive after it fired observe it immediately.
#[derive(Debug, Clone)]
pub struct LifecycleSignal {
    name: &'static str,
    tx: Arc<watch::Sender<bool>>,
}

impl LifecycleSignal {
    pub fn new(name: &'static str) -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            name,
            tx: Arc::new(tx),
        }
    }

    /// Fire the signal. Returns true only for the call that fired it.
    pub fn fire(&self) -> bool {
        let fired = self.tx.send_if_modified(|fired| !std::mem::replace(fired, true));
        if fired {
            tracing::debug!(signal = self.name, "Lifecycle signal fired");
        }
        fired
    }

    pub fn is_fired(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn subscribe(&self) -> SignalListener {
        SignalListener {
            rx: self.tx.subscribe(),
        }
    }
}

/// Receiving side of a [`LifecycleSignal`].
#[derive(Debug)]
pub struct SignalListener {
    rx: watch::Receiver<bool>,
}

impl SignalListener {
    /// Wait until the signal has fired.
    pub async fn recv(&mut self) {
        if self.rx.wait_for(|fired| *fired).await.is_err() {
            // Every sender is gone, so it can never fire.
            std::future::pending::<()>().await;
        }
    }

    pub fn is_fired(&self) -> bool {
        *self.rx.borrow()
    }
}

/// The lifecycle events a process goes through on its way out.
#[derive(Debug, Clone)]
pub struct ProcessSignals {
    /// The application context is closing; shutdown hooks should run.
    pub closing: LifecycleSignal,
    /// The operator wants out now; blocking waits must give up.
    pub interrupt: LifecycleSignal,
}

impl ProcessSignals {
    pub fn new() -> Self {
        Self {
            closing: LifecycleSignal::new("closing"),
            interrupt: LifecycleSignal::new("interrupt"),
        }
    }
}

impl Default for ProcessSignals {
    fn default() -> Self {
        Self::new()
    }
}

/// Fire `closing` on the first termination signal and `interrupt` on the
/// second.
pub async fn listen_for_signals(signals: ProcessSignals) {
    let received = wait_for_termination().await;
    tracing::info!(signal = received, "Termination signal received, closing application");
    signals.closing.fire();

    let received = wait_for_termination().await;
    tracing::warn!(signal = received, "Second termination signal received, interrupting shutdown");
    signals.interrupt.fire();
}

async fn wait_for_termination() -> &'static str {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn fires_only_once() {
        let signal = LifecycleSignal::new("test");
        assert!(!signal.is_fired());
        assert!(signal.fire());
        assert!(!signal.fire());
        assert!(signal.is_fired());
    }

    #[tokio::test]
    async fn late_subscriber_sees_fired_signal() {
        let signal = LifecycleSignal::new("test");
        signal.fire();

        let mut listener = signal.subscribe();
        assert!(listener.is_fired());
        tokio::time::timeout(Duration::from_secs(1), listener.recv())
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn recv_waits_until_fired() {
        let signal = LifecycleSignal::new("test");
        let mut listener = signal.subscribe();

        let pending = tokio::time::timeout(Duration::from_secs(5), listener.recv()).await;
        assert!(pending.is_err());

        let firing = signal.clone();
        tokio::spawn(async move { firing.fire() });
        listener.recv().await;
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_signal_never_fires() {
        let signal = LifecycleSignal::new("test");
        let mut listener = signal.subscribe();
        drop(signal);

        let waited = tokio::time::timeout(Duration::from_secs(5), listener.recv()).await;
        assert!(waited.is_err());
    }
}
