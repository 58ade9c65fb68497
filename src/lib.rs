//! Graceful shutdown for an HTTP service.
//!
//! On the closing event the listener is paused, the request worker pool is
//! shut down and drained with periodic progress logging, and anything still
//! running when the timeout expires is reported before the process exits.

pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod pool;

pub use config::schema::ServiceConfig;
pub use error::AppError;
pub use http::HttpServer;
pub use lifecycle::{Application, ShutdownCoordinator};
