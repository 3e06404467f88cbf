//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check backend-specific settings
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{BackendKind, ServiceConfig};

/// One rejected setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_ms == 0 {
        errors.push(ValidationError::new("timeouts.request_ms", "must be greater than zero"));
    }
    for (i, o) in config.timeouts.overrides.iter().enumerate() {
        if o.request_ms == 0 {
            errors.push(ValidationError::new(
                format!("timeouts.overrides[{i}].request_ms"),
                "must be greater than zero",
            ));
        }
        let repeated = config.timeouts.overrides[..i]
            .iter()
            .any(|p| p.resource == o.resource && p.operation == o.operation);
        if repeated {
            errors.push(ValidationError::new(
                format!("timeouts.overrides[{i}]"),
                format!("duplicate override for {} {}", o.resource, o.operation),
            ));
        }
    }

    if config.auth.header.trim().is_empty() {
        errors.push(ValidationError::new("auth.header", "must not be empty"));
    } else if axum::http::HeaderName::from_bytes(config.auth.header.as_bytes()).is_err() {
        errors.push(ValidationError::new("auth.header", "is not a valid header name"));
    }
    if config.auth.credential.is_empty() {
        errors.push(ValidationError::new("auth.credential", "must not be empty"));
    }

    if config.storage.backend == BackendKind::Sqlite {
        if config.storage.sqlite_url.trim().is_empty() {
            errors.push(ValidationError::new("storage.sqlite_url", "required for the sqlite backend"));
        }
        if config.storage.max_connections == 0 {
            errors.push(ValidationError::new("storage.max_connections", "must be greater than zero"));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than zero"));
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
    use crate::config::schema::TimeoutOverride;
    use crate::resources::ResourceKind;
    use crate::routing::Operation;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&ServiceConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ServiceConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.timeouts.request_ms = 0;
        config.auth.credential.clear();
        config.storage.backend = BackendKind::Sqlite;
        config.storage.sqlite_url = " ".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            ["listener.bind_address", "timeouts.request_ms", "auth.credential", "storage.sqlite_url"]
        );
    }

    #[test]
    fn test_duplicate_override_rejected() {
        let mut config = ServiceConfig::default();
        let o = TimeoutOverride {
            resource: ResourceKind::Person,
            operation: Operation::Read,
            request_ms: 100,
        };
        config.timeouts.overrides = vec![o.clone(), o];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("duplicate"));
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = ServiceConfig::default();
        config.observability.metrics_address = "bogus".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
