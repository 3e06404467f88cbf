//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Overrides `auth.credential`.
pub const CREDENTIAL_ENV: &str = "MENAGERIE_CREDENTIAL";
/// Overrides `listener.bind_address`.
pub const BIND_ENV: &str = "MENAGERIE_BIND";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse, apply environment overrides, then validate.
pub fn parse_config(content: &str) -> Result<ServiceConfig, ConfigError> {
    let mut config: ServiceConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Defaults plus environment overrides, validated.
pub fn default_config() -> Result<ServiceConfig, ConfigError> {
    parse_config("")
}

fn apply_env_overrides(config: &mut ServiceConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(credential) = lookup(CREDENTIAL_ENV) {
        config.auth.credential = credential;
    }
    if let Some(bind) = lookup(BIND_ENV) {
        config.listener.bind_address = bind;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_env_overrides_take_precedence() {
        let mut config = ServiceConfig::default();
        apply_env_overrides(&mut config, |key| match key {
            CREDENTIAL_ENV => Some("from-env".into()),
            BIND_ENV => Some("0.0.0.0:9999".into()),
            _ => None,
        });
        assert_eq!(config.auth.credential, "from-env");
        assert_eq!(config.listener.bind_address, "0.0.0.0:9999");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[timeouts]\nrequest_ms = 750").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.timeouts.request_ms, 750);
    }

    #[test]
    fn test_invalid_values_surface_as_validation_error() {
        let err = parse_config("[timeouts]\nrequest_ms = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("timeouts.request_ms"));
    }

    #[test]
    fn test_syntax_error_is_parse_error() {
        let err = parse_config("[listener\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
