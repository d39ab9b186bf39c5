//! Layered configuration loading.
//!
//! Sources apply in order: defaults or a preset, a configuration file, a
//! `.env` file, `PREFIX__SECTION__KEY` overrides, and finally the
//! `PREFIX_ENV` and `PREFIX_LOGLEVEL` shortcuts.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use bindery_core::Environment;

use crate::{BinderyConfig, ConfigError, ConfigResult, LogFormat};

/// Configuration loader with layered sources.
///
/// # Example
///
/// ```no_run
/// use bindery_config::ConfigLoader;
///
/// # fn main() -> Result<(), bindery_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_service_files("users")?
///     .with_dotenv()?
///     .with_env_prefix("USERS")
///     .load()?;
///
/// println!("Listening on {}", config.server.http_addr);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: BinderyConfig,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Create a loader starting from default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to the default values.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = BinderyConfig::default();
        self
    }

    /// Reset to the development preset.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = BinderyConfig::development();
        self
    }

    /// Reset to the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = BinderyConfig::production();
        self
    }

    /// Load configuration from a `.toml` or `.json` file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file does not exist, cannot be read,
    /// has an unknown extension, or contains invalid or unknown fields.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> ConfigResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::missing(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::unreadable(path, e))?;
        self.config = Self::parse_file(&content, path)?;

        Ok(self)
    }

    /// Load configuration from a file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> ConfigResult<Self> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load the first existing file named after the service.
    ///
    /// Looks for `./<name>.toml`, `./<name>.json`, `/etc/<name>/<name>.toml`
    /// and `/etc/<name>/<name>.json`, in that order. None of them is required.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file found cannot be loaded.
    pub fn with_service_files(self, name: &str) -> ConfigResult<Self> {
        let etc = Path::new("/etc").join(name);
        self.with_first_file(&[PathBuf::from("."), etc], name)
    }

    fn with_first_file(self, dirs: &[PathBuf], name: &str) -> ConfigResult<Self> {
        let found = dirs
            .iter()
            .flat_map(|dir| ["toml", "json"].map(|ext| dir.join(format!("{name}.{ext}"))))
            .find(|candidate| candidate.is_file());

        match found {
            Some(path) => self.with_file(path),
            None => Ok(self),
        }
    }

    /// Load configuration from a string in the given format (`toml` or `json`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails.
    ///
    /// # Example
    ///
    /// ```
    /// use bindery_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     [service]
    ///     name = "users"
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.service.name, "users");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> ConfigResult<Self> {
        let format = format.to_lowercase();
        if format != "toml" && format != "json" {
            return Err(ConfigError::UnsupportedFormat { origin: format });
        }
        self.config = Self::parse(content, &format, Path::new("<string>"))?;
        Ok(self)
    }

    /// Set the environment variable prefix.
    ///
    /// With prefix `USERS`, `USERS__SERVER__HTTP_ADDR` overrides
    /// `server.http_addr`, `USERS_ENV` selects the environment and
    /// `USERS_LOGLEVEL` the log level.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load a `.env` file from the current directory or its parents.
    ///
    /// A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file exists but is malformed.
    pub fn with_dotenv(self) -> ConfigResult<Self> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply environment overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override cannot be parsed or validation fails.
    pub fn load(mut self) -> ConfigResult<BinderyConfig> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix, env::vars())?;
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Return the configuration without environment overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> BinderyConfig {
        self.config
    }

    fn parse_file(content: &str, path: &Path) -> ConfigResult<BinderyConfig> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        Self::parse(content, extension.as_deref().unwrap_or_default(), path)
    }

    fn parse(content: &str, format: &str, origin: &Path) -> ConfigResult<BinderyConfig> {
        match format {
            "toml" => toml::from_str(content).map_err(|e| ConfigError::toml(origin, e)),
            "json" => serde_json::from_str(content).map_err(|e| ConfigError::json(origin, e)),
            _ => Err(ConfigError::UnsupportedFormat {
                origin: origin.display().to_string(),
            }),
        }
    }

    fn apply_env_overrides(
        &mut self,
        prefix: &str,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> ConfigResult<()> {
        let nested = format!("{prefix}__");
        let env_key = format!("{prefix}_ENV");
        let level_key = format!("{prefix}_LOGLEVEL");

        let mut environment = None;
        let mut level = None;

        for (key, value) in vars {
            if key.starts_with(&nested) {
                self.apply_env_var(&key, &value, prefix)?;
            } else if key == env_key {
                environment = Some(value);
            } else if key == level_key {
                level = Some(value);
            }
        }

        // Shortcuts win over section overrides.
        if let Some(value) = environment {
            self.config.service.environment = Environment::from_env_value(&value);
        }
        if let Some(value) = level {
            self.config.logging.level = Some(value);
        }

        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> ConfigResult<()> {
        let key_without_prefix = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::bad_override(key, "named PREFIX__SECTION__KEY"))?;

        let parts: Vec<&str> = key_without_prefix.split("__").collect();

        match parts.as_slice() {
            ["SERVICE", "NAME"] => {
                self.config.service.name = value.to_string();
            }
            ["SERVICE", "ENVIRONMENT"] => {
                self.config.service.environment = Environment::from_env_value(value);
            }
            ["SERVER", "HTTP_ADDR"] => {
                self.config.server.http_addr = value.to_string();
            }
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                self.config.server.shutdown_timeout_secs = value
                    .parse()
                    .map_err(|_| ConfigError::bad_override(key, "an integer"))?;
            }
            ["SERVER", "REQUEST_TIMEOUT_MS"] => {
                self.config.server.request_timeout_ms = value
                    .parse()
                    .map_err(|_| ConfigError::bad_override(key, "an integer"))?;
            }
            ["SERVER", "SERVER_HEADER"] => {
                self.config.server.server_header = value.to_string();
            }
            ["SERVER", "MAX_BODY_BYTES"] => {
                self.config.server.max_body_bytes = value
                    .parse()
                    .map_err(|_| ConfigError::bad_override(key, "an integer"))?;
            }
            ["LOGGING", "LEVEL"] => {
                self.config.logging.level = Some(value.to_string());
            }
            ["LOGGING", "FORMAT"] => {
                self.config.logging.format = Some(match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => return Err(ConfigError::bad_override(key, "`json` or `pretty`")),
                });
            }
            ["LOGGING", "ANSI_ENABLED"] => {
                self.config.logging.ansi_enabled = Some(
                    parse_bool(value)
                        .ok_or_else(|| ConfigError::bad_override(key, "a boolean"))?,
                );
            }
            ["METRICS", "ENABLED"] => {
                self.config.metrics.enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::bad_override(key, "a boolean"))?;
            }
            ["METRICS", "ADDR"] => {
                self.config.metrics.addr = value.to_string();
            }
            _ => {}
        }

        Ok(())
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
