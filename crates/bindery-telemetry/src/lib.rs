//! Observability for Bindery services.
//!
//! - **Logging**: `tracing-subscriber` setup, JSON in production and pretty
//!   output in development
//! - **Metrics**: Prometheus exporter and the method duration histogram
//! - **Middleware**: method logging and method duration decorators
//! - **Reports**: error cause chains rendered for log lines
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `bindery_service_method_duration_seconds` | Histogram | `service`, `method` | Method invocation latency |
//!
//! # Example
//!
//! ```rust,ignore
//! use bindery_telemetry::{init_logging, middleware, prometheus_exporter, LogConfig, MetricsConfig};
//!
//! init_logging(&LogConfig::production())?;
//! let exporter = prometheus_exporter(&MetricsConfig::default())?;
//!
//! service.add_middleware(middleware::method_duration());
//! service.add_middleware(middleware::logging());
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod metrics;
pub mod middleware;
mod report;

pub use error::TelemetryError;
pub use logging::{init_logging, level_directive, LogConfig};
pub use metrics::{prometheus_exporter, MetricsConfig, METHOD_DURATION_SECONDS};
pub use middleware::{MethodDuration, MethodLogging};
pub use report::Report;

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
