//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, HTTP/1.1 + HTTP/2)
//!     → worker pool dispatch (503 once the pool is shut down)
//!     → liveness endpoint or application routes
//!     → Send to client
//! ```

pub mod demo;
pub mod server;

pub use server::HttpServer;
