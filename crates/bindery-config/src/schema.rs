//! Configuration schema types.
//!
//! This module defines the structure of all configuration sections.

use bindery_core::Environment;
use serde::{Deserialize, Serialize};

/// Service identity section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Service name, used in logs, metrics labels and the health endpoint.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Deployment environment. Production selects compact JSON bodies.
    #[serde(default)]
    pub environment: Environment,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            environment: Environment::default(),
        }
    }
}

fn default_service_name() -> String {
    "bindery-service".to_string()
}

/// Server configuration section.
///
/// # Example
///
/// ```
/// use bindery_config::ServerConfig;
///
/// let config = ServerConfig {
///     http_addr: "127.0.0.1:3000".to_string(),
///     ..ServerConfig::default()
/// };
/// assert_eq!(config.server_header, "bindery");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// HTTP server bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Request timeout in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Value of the `Server` response header.
    #[serde(default = "default_server_header")]
    pub server_header: String,

    /// Largest request body accepted, in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            request_timeout_ms: default_request_timeout(),
            server_header: default_server_header(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    30000
}

fn default_server_header() -> String {
    "bindery".to_string()
}

fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON lines (production).
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging section.
///
/// Unset fields follow the service environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Minimum level (`debug`, `info`, `warn`, `error`). Unset logs everything.
    #[serde(default)]
    pub level: Option<String>,

    /// Output format.
    #[serde(default)]
    pub format: Option<LogFormat>,

    /// Whether to emit ANSI colors.
    #[serde(default)]
    pub ansi_enabled: Option<bool>,
}

/// Metrics exporter section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Whether the Prometheus exporter runs.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Exporter listen address.
    #[serde(default = "default_metrics_addr")]
    pub addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            addr: default_metrics_addr(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}
