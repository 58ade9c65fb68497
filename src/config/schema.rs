//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Application name, used in log lines and the liveness report.
    /// Required: an absent key is left empty and rejected by validation.
    pub application_name: String,

    /// Listener configuration (bind address, connection and worker limits).
    pub listener: ListenerConfig,

    /// Graceful shutdown settings.
    pub shutdown: ShutdownConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            application_name: String::new(),
            listener: ListenerConfig::default(),
            shutdown: ShutdownConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,

    /// Size of the request worker pool. Zero runs requests without a
    /// managed pool, leaving nothing for shutdown to drain.
    pub worker_threads: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
            worker_threads: 200,
        }
    }
}

/// Graceful shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// When false, shutdown is immediate with no drain.
    pub enabled: bool,

    /// How often drain progress is re-checked and logged, in seconds.
    pub poll_interval_secs: u64,

    /// Hard ceiling on the total drain wait, in seconds.
    pub timeout_secs: u64,
}

impl ShutdownConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: 10,
            timeout_secs: 60,
        }
    }
}

/// Timeout configuration for request handling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_file_uses_defaults() {
        let config: ServiceConfig = toml::from_str(r#"application_name = "app1""#).unwrap();
        assert_eq!(config.application_name, "app1");
        assert!(config.shutdown.enabled);
        assert_eq!(config.shutdown.poll_interval_secs, 10);
        assert_eq!(config.shutdown.timeout_secs, 60);
        assert_eq!(config.listener.worker_threads, 200);
    }

    #[test]
    fn absent_name_stays_empty() {
        let config: ServiceConfig = toml::from_str("[shutdown]\ntimeout_secs = 5\n").unwrap();
        assert!(config.application_name.is_empty());
    }

    #[test]
    fn shutdown_section_overrides() {
        let config: ServiceConfig = toml::from_str(
            r#"
            application_name = "app2"

            [shutdown]
            enabled = false
            poll_interval_secs = 2
            timeout_secs = 5
            "#,
        )
        .unwrap();
        assert!(!config.shutdown.enabled);
        assert_eq!(config.shutdown.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.shutdown.timeout(), Duration::from_secs(5));
    }
}
