//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Build server and pool → Bind listener → Register hooks → Serve
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → closing event (fires once)
//!     second SIGTERM/SIGINT → interrupt event
//!
//! Shutdown (hooks.rs, shutdown.rs):
//!     closing → hooks in precedence order
//!             → coordinator: pause listener → shut down pool → drain → escalate
//!             → close listener → exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Ordered shutdown: the coordinator runs at highest precedence
//! - Shutdown has timeout: work still running afterwards is logged, not killed
//! - Only an interrupt can end the sequence early, and it is propagated as is

pub mod hooks;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use hooks::{ShutdownHook, ShutdownHooks, HIGHEST_PRECEDENCE, LOWEST_PRECEDENCE};
pub use shutdown::{drain, DrainOutcome, DrainState, ShutdownCoordinator};
pub use signals::{listen_for_signals, LifecycleSignal, ProcessSignals, SignalListener};
pub use startup::Application;

/// Error type for the shutdown sequence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShutdownError {
    /// An interrupt arrived while the sequence was blocked.
    #[error("shutdown interrupted while {phase}")]
    Interrupted { phase: &'static str },
}
