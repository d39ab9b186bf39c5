//! Structured logging for Bindery services.
//!
//! Production services log JSON lines; development services log the pretty
//! multi-line format.
//!
//! # Example
//!
//! ```rust,ignore
//! use bindery_telemetry::logging::{init_logging, LogConfig};
//!
//! let config = LogConfig::production().with_level("info");
//! init_logging(&config)?;
//!
//! tracing::info!(service = "users", method = "GetUser", "Method invoked");
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Minimum level: `debug`, `info`, `warn` or `error`.
    ///
    /// Unset or unrecognized values let every event through.
    pub level: Option<String>,

    /// Whether to output JSON lines.
    pub json_format: bool,

    /// Whether to emit ANSI colors.
    pub ansi: bool,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include target (module path).
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LogConfig {
    /// Creates a development configuration with human-readable output.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: None,
            json_format: false,
            ansi: true,
            file_line_info: true,
            include_target: true,
        }
    }

    /// Creates a production configuration with JSON output.
    #[must_use]
    pub fn production() -> Self {
        Self {
            enabled: true,
            level: None,
            json_format: true,
            ansi: false,
            file_line_info: false,
            include_target: true,
        }
    }

    /// Returns a copy with the given level.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// Returns the filter directive derived from [`LogConfig::level`].
    #[must_use]
    pub fn directive(&self) -> &'static str {
        level_directive(self.level.as_deref())
    }
}

/// Maps a configured level name to a filter directive.
///
/// `debug`, `info`, `warn` and `error` (any case) map to themselves; anything
/// else, including no value, maps to `trace`.
#[must_use]
pub fn level_directive(level: Option<&str>) -> &'static str {
    match level.map(|level| level.trim().to_ascii_lowercase()).as_deref() {
        Some("debug") => "debug",
        Some("info") => "info",
        Some("warn") => "warn",
        Some("error") => "error",
        _ => "trace",
    }
}

/// Initializes the logging subsystem.
///
/// # Errors
///
/// Returns `TelemetryError::LogFilter` for an unusable level and
/// `TelemetryError::SubscriberTaken` if a global subscriber is already set.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let directive = config.directive();
    let filter = EnvFilter::try_new(directive).map_err(|source| TelemetryError::LogFilter {
        directive: directive.to_string(),
        source,
    })?;

    if config.json_format {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_ansi(config.ansi)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(TelemetryError::SubscriberTaken)?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_ansi(config.ansi)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(TelemetryError::SubscriberTaken)?;
    }

    Ok(())
}

/// Standard log field names.
pub mod fields {
    /// Service name field name.
    pub const SERVICE: &str = "service";

    /// Method name field name.
    pub const METHOD: &str = "method";

    /// Request ID field name.
    pub const REQUEST_ID: &str = "request_id";

    /// HTTP status code field name.
    pub const STATUS: &str = "status";

    /// Duration field name (in milliseconds).
    pub const DURATION_MS: &str = "duration_ms";

    /// Error field name.
    pub const ERROR: &str = "error";
}
