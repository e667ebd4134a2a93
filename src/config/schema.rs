//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::circle::HttpBackendOptions;

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Ordered circle definitions. Order decides slot assignment.
    pub circles: Vec<CircleConfig>,

    /// Database whitelist; empty allows every database except `_internal`.
    pub db_list: Vec<String>,

    /// Client authentication.
    pub auth: AuthConfig,

    /// HTTP endpoint behaviour.
    pub http: HttpConfig,

    /// Backend buffering and timeouts.
    pub backend: BackendSettings,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:7076").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:7076".to_string(),
        }
    }
}

/// One circle: a full set of interchangeable backends.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CircleConfig {
    /// Circle identifier for logging/health.
    pub name: String,

    /// Backends, in hashing order.
    pub backends: Vec<BackendConfig>,
}

/// Backend server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Backend identifier, unique within its circle.
    pub name: String,

    /// Base URL (e.g., "http://127.0.0.1:8086").
    pub url: String,
}

/// Credentials required from clients. Both empty disables authentication.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

impl AuthConfig {
    pub fn enabled(&self) -> bool {
        !self.username.is_empty() || !self.password.is_empty()
    }
}

/// HTTP endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Only accept writes for this database, when set.
    pub database: Option<String>,

    /// Log every query.
    pub query_tracing: bool,

    /// Log every write body.
    pub write_tracing: bool,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            database: None,
            query_tracing: false,
            write_tracing: false,
            request_timeout_secs: 60,
        }
    }
}

/// Backend buffering and timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Rows per flush.
    pub flush_size: usize,

    /// Flush interval in milliseconds.
    pub flush_time_ms: u64,

    /// Points buffered per backend before writes are rejected.
    pub buffer_capacity: usize,

    /// Health check timeout in seconds.
    pub check_timeout_secs: u64,

    /// Query/write request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            flush_size: 5000,
            flush_time_ms: 1000,
            buffer_capacity: 100_000,
            check_timeout_secs: 5,
            request_timeout_secs: 30,
        }
    }
}

impl BackendSettings {
    pub fn options(&self) -> HttpBackendOptions {
        HttpBackendOptions {
            flush_size: self.flush_size,
            flush_time: Duration::from_millis(self.flush_time_ms),
            buffer_capacity: self.buffer_capacity,
            check_timeout: Duration::from_secs(self.check_timeout_secs),
        }
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
