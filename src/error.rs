//! Application-level error type.

use crate::config::ConfigError;
use crate::lifecycle::ShutdownError;
use crate::net::ListenerError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Listener(#[from] ListenerError),
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
}
