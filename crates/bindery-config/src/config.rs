//! Main configuration type.

use std::net::SocketAddr;

use bindery_core::Environment;
use bindery_telemetry::{LogConfig, MetricsConfig as ExporterConfig};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, ConfigResult, LogFormat, LoggingConfig, MetricsConfig, ServerConfig, ServiceConfig};

/// Complete Bindery service configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use bindery_config::BinderyConfig;
///
/// let config = BinderyConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert_eq!(config.service.name, "bindery-service");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct BinderyConfig {
    /// Service identity.
    #[serde(default)]
    pub service: ServiceConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Prometheus exporter settings.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Settings owned by the application itself, read with
    /// [`app_settings`](Self::app_settings). Environment overrides never reach it.
    #[serde(default, skip_serializing_if = "toml::Table::is_empty")]
    pub app: toml::Table,
}

impl BinderyConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - The service name is empty
    /// - The server address is not a socket address
    /// - Metrics are enabled and their address is not a socket address
    pub fn validate(&self) -> ConfigResult<()> {
        if self.service.name.trim().is_empty() {
            return Err(ConfigError::invalid("service.name", "must not be empty"));
        }

        if self.server.http_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid(
                "server.http_addr",
                format!("is not a socket address: {}", self.server.http_addr),
            ));
        }

        if self.metrics.enabled && self.metrics.addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid(
                "metrics.addr",
                format!("is not a socket address: {}", self.metrics.addr),
            ));
        }

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// Pretty logs with ANSI colors and indented JSON bodies.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.service.environment = Environment::Development;
        config.logging.format = Some(LogFormat::Pretty);
        config.logging.ansi_enabled = Some(true);
        config
    }

    /// Create a production configuration preset.
    ///
    /// JSON logs at `info` and compact JSON bodies.
    ///
    /// # Example
    ///
    /// ```
    /// use bindery_config::{BinderyConfig, LogFormat};
    ///
    /// let config = BinderyConfig::production();
    /// assert_eq!(config.logging.format, Some(LogFormat::Json));
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.service.environment = Environment::Production;
        config.logging.level = Some("info".to_string());
        config.logging.format = Some(LogFormat::Json);
        config.logging.ansi_enabled = Some(false);
        config
    }

    /// Builds the logging setup, filling unset fields from the environment.
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        let base = if self.service.environment.is_production() {
            LogConfig::production()
        } else {
            LogConfig::development()
        };

        LogConfig {
            level: self.logging.level.clone(),
            json_format: self
                .logging
                .format
                .map_or(base.json_format, |format| format == LogFormat::Json),
            ansi: self.logging.ansi_enabled.unwrap_or(base.ansi),
            ..base
        }
    }

    /// Deserializes the `[app]` section into the application's own type.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::AppSection` if the section does not fit `C`.
    ///
    /// # Example
    ///
    /// ```
    /// use bindery_config::ConfigLoader;
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct Settings {
    ///     greeting: String,
    /// }
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[app]\ngreeting = \"hello\"", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// let settings: Settings = config.app_settings().unwrap();
    /// assert_eq!(settings.greeting, "hello");
    /// ```
    pub fn app_settings<C: DeserializeOwned>(&self) -> ConfigResult<C> {
        toml::Value::Table(self.app.clone())
            .try_into()
            .map_err(ConfigError::AppSection)
    }

    /// Builds the Prometheus exporter setup.
    #[must_use]
    pub fn metrics_config(&self) -> ExporterConfig {
        ExporterConfig {
            enabled: self.metrics.enabled,
            addr: self.metrics.addr.clone(),
        }
    }
}
