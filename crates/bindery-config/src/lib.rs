//! Typed configuration for Bindery services.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → `.env` → environment)
//!
//! # Example
//!
//! ```no_run
//! use bindery_config::ConfigLoader;
//!
//! # fn main() -> Result<(), bindery_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_file("users.toml")?
//!     .with_env_prefix("USERS")
//!     .load()?;
//!
//! println!("Server will listen on: {}", config.server.http_addr);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [service]
//! name = "users"
//! environment = "production"
//!
//! [server]
//! http_addr = "0.0.0.0:8080"
//! shutdown_timeout_secs = 30
//! request_timeout_ms = 30000
//! server_header = "bindery"
//! max_body_bytes = 2097152
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [metrics]
//! enabled = true
//! addr = "0.0.0.0:9090"
//!
//! # Read by the application with `BinderyConfig::app_settings`.
//! [app]
//! upstream = "http://accounts:8080"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden with `PREFIX__SECTION__KEY`:
//!
//! - `USERS__SERVER__HTTP_ADDR=0.0.0.0:9000`
//! - `USERS__METRICS__ENABLED=false`
//!
//! `PREFIX_ENV` (`prod`, `production` or `prd` select production) and
//! `PREFIX_LOGLEVEL` are applied last.

mod config;
mod error;
mod loader;
mod schema;

pub use config::BinderyConfig;
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use schema::{LogFormat, LoggingConfig, MetricsConfig, ServerConfig, ServiceConfig};
