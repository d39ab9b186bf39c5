//! Configuration errors.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why a configuration could not be produced.
///
/// `origin` fields name where the text came from: a file path, or `<string>`
/// for [`ConfigLoader::with_string`](crate::ConfigLoader::with_string).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required configuration file does not exist.
    #[error("no configuration file at {}", path.display())]
    Missing {
        /// The path that was looked up.
        path: PathBuf,
    },

    /// The file exists but reading it failed.
    #[error("cannot read configuration file {}", path.display())]
    Unreadable {
        /// The file.
        path: PathBuf,
        /// The I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The text is not valid TOML for the configuration schema.
    #[error("malformed TOML configuration in {origin}")]
    Toml {
        /// Where the text came from.
        origin: String,
        /// The parser's report.
        #[source]
        source: toml::de::Error,
    },

    /// The text is not valid JSON for the configuration schema.
    #[error("malformed JSON configuration in {origin}")]
    Json {
        /// Where the text came from.
        origin: String,
        /// The parser's report.
        #[source]
        source: serde_json::Error,
    },

    /// Neither a `.toml` nor a `.json` source.
    #[error("{origin} is neither TOML nor JSON")]
    UnsupportedFormat {
        /// The file path or format name given.
        origin: String,
    },

    /// A loaded value breaks a rule of the schema.
    #[error("`{key}` {reason}")]
    Invalid {
        /// Dotted key, e.g. `server.http_addr`.
        key: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A `PREFIX__SECTION__KEY` override holds the wrong kind of value.
    #[error("environment variable {var} should be {expected}")]
    BadOverride {
        /// The variable name.
        var: String,
        /// The kind of value the key takes.
        expected: &'static str,
    },

    /// The `[app]` section does not fit the type asked for.
    #[error("the [app] section does not match the application settings")]
    AppSection(#[source] toml::de::Error),

    /// The `.env` file exists but could not be loaded.
    #[error("malformed .env file")]
    Dotenv(#[from] dotenvy::Error),
}

impl ConfigError {
    pub(crate) fn missing(path: impl Into<PathBuf>) -> Self {
        Self::Missing { path: path.into() }
    }

    pub(crate) fn unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Unreadable {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn toml(origin: &Path, source: toml::de::Error) -> Self {
        Self::Toml {
            origin: origin.display().to_string(),
            source,
        }
    }

    pub(crate) fn json(origin: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            origin: origin.display().to_string(),
            source,
        }
    }

    pub(crate) fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn bad_override(var: impl Into<String>, expected: &'static str) -> Self {
        Self::BadOverride {
            var: var.into(),
            expected,
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_missing_names_path() {
        let err = ConfigError::missing("/etc/users/users.toml");
        assert_eq!(
            err.to_string(),
            "no configuration file at /etc/users/users.toml"
        );
    }

    #[test]
    fn test_unreadable_keeps_io_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ConfigError::unreadable("users.toml", io);
        assert_eq!(err.to_string(), "cannot read configuration file users.toml");
        assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("denied"));
    }

    #[test]
    fn test_parse_errors_name_origin() {
        let source = toml::from_str::<toml::Table>("= 1").unwrap_err();
        let err = ConfigError::toml(Path::new("users.toml"), source);
        assert_eq!(err.to_string(), "malformed TOML configuration in users.toml");
        assert!(err.source().is_some());

        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ConfigError::json(Path::new("<string>"), source);
        assert_eq!(err.to_string(), "malformed JSON configuration in <string>");
    }

    #[test]
    fn test_invalid_quotes_key() {
        let err = ConfigError::invalid("server.http_addr", "is not a socket address: x");
        assert_eq!(err.to_string(), "`server.http_addr` is not a socket address: x");
    }

    #[test]
    fn test_bad_override_names_expected_kind() {
        let err = ConfigError::bad_override("USERS__SERVER__REQUEST_TIMEOUT_MS", "an integer");
        assert_eq!(
            err.to_string(),
            "environment variable USERS__SERVER__REQUEST_TIMEOUT_MS should be an integer"
        );
    }
}
