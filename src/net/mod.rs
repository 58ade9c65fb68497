//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits, pause gate)
//!     → connection.rs (connection id, HTTP/1 + HTTP/2 serving)
//!     → Hand off to HTTP layer
//!
//! Listener States:
//!     Accepting ⇄ Paused → Closed
//! ```
//!
//! # Design Decisions
//! - Bounded accept prevents resource exhaustion
//! - Pausing leaves already-accepted connections untouched
//! - The listener handle carries the worker pool so shutdown can find it

pub mod connection;
pub mod listener;

pub use connection::ConnectionId;
pub use listener::{ConnectionPermit, Listener, ListenerBinder, ListenerError, ListenerHandle};
