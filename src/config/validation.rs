//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (poll interval > 0, limits > 0)
//! - Check addresses parse before anything binds
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::ServiceConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("application_name must not be empty")]
    MissingApplicationName,
    #[error("shutdown.poll_interval_secs must be greater than zero")]
    ZeroPollInterval,
    #[error("listener.max_connections must be greater than zero")]
    ZeroMaxConnections,
    #[error("invalid {field} address '{value}'")]
    InvalidAddress { field: &'static str, value: String },
}

/// Validate a parsed configuration, collecting every error found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.application_name.trim().is_empty() {
        errors.push(ValidationError::MissingApplicationName);
    }
    if config.shutdown.poll_interval_secs == 0 {
        errors.push(ValidationError::ZeroPollInterval);
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }
    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named() -> ServiceConfig {
        let mut config = ServiceConfig::default();
        config.application_name = "app1".into();
        config
    }

    #[test]
    fn named_defaults_are_valid() {
        assert_eq!(validate_config(&named()), Ok(()));
    }

    #[test]
    fn defaults_need_a_name() {
        assert_eq!(
            validate_config(&ServiceConfig::default()),
            Err(vec![ValidationError::MissingApplicationName])
        );
    }

    #[test]
    fn zero_timeout_is_allowed() {
        let mut config = named();
        config.shutdown.timeout_secs = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn reports_every_error() {
        let mut config = ServiceConfig::default();
        config.application_name = "  ".into();
        config.shutdown.poll_interval_secs = 0;
        config.listener.bind_address = "not-an-address".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::MissingApplicationName));
        assert!(errors.contains(&ValidationError::ZeroPollInterval));
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = named();
        config.observability.metrics_address = "bogus".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
