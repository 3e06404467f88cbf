//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::resources::ResourceKind;
use crate::routing::Operation;

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Request deadlines.
    pub timeouts: TimeoutConfig,

    /// Shared-secret authorization.
    pub auth: AuthConfig,

    /// Persistence backend selection.
    pub storage: StorageConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline applied to every route without an override, in milliseconds.
    pub request_ms: u64,

    /// Per-route deadlines.
    pub overrides: Vec<TimeoutOverride>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_ms: 2000,
            overrides: Vec::new(),
        }
    }
}

/// Deadline for one (resource, operation) pair.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TimeoutOverride {
    pub resource: ResourceKind,
    pub operation: Operation,
    pub request_ms: u64,
}

/// Authorization configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Request header holding the credential.
    pub header: String,

    /// Expected header value, compared exactly.
    pub credential: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            header: "authorization".to_string(),
            // WARNING: This is a placeholder! Change this in production.
            credential: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

/// Which backend holds the records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    Sqlite,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: BackendKind,

    /// SQLite connection URL (e.g., "sqlite://menagerie.db?mode=rwc").
    pub sqlite_url: String,

    /// SQLite pool size.
    pub max_connections: u32,

    /// Mark rows deleted instead of removing them.
    pub soft_delete: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            sqlite_url: "sqlite://menagerie.db?mode=rwc".to_string(),
            max_connections: 5,
            soft_delete: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON lines instead of human-readable output.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 64 * 1024,
        }
    }
}
