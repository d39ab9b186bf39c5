//! Runtime environment of a service.

use bindery_codec::JsonFormat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The mode a service runs in.
///
/// Production switches JSON output to its compact form and logs to JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Production deployment
    #[serde(alias = "prod", alias = "prd")]
    Production,
}

impl Environment {
    /// Interprets an environment variable value.
    ///
    /// `prod`, `production` and `prd` (any case) select production; anything
    /// else selects development.
    #[must_use]
    pub fn from_env_value(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" | "prd" => Self::Production,
            _ => Self::Development,
        }
    }

    /// Returns `true` in production.
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    /// Returns the JSON layout used for response bodies.
    #[must_use]
    pub const fn json_format(self) -> JsonFormat {
        match self {
            Self::Development => JsonFormat::Pretty,
            Self::Production => JsonFormat::Compact,
        }
    }

    /// Returns the lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
