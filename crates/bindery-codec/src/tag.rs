//! Field binding descriptors.
//!
//! Every field of a request or response message carries an `http` descriptor
//! naming where its value lives:
//!
//! | Descriptor | Binding |
//! |------------|---------|
//! | `body` | the whole request body, decoded as JSON |
//! | `query[,name]` | URL query parameter |
//! | `path[,name]` | router path capture |
//! | `header[,name]` | request header |
//! | `cookie[,name]` | request cookie |
//!
//! When `name` is omitted it defaults to the lower-cased field name.
//!
//! # Example
//!
//! ```rust
//! use bindery_codec::tag::{parse_tag, Binding, Location};
//!
//! let binding = parse_tag("user_id", Some("path,id")).unwrap();
//! assert_eq!(binding, Binding::param(Location::Path, "id"));
//!
//! let binding = parse_tag("Limit", Some("query")).unwrap();
//! assert_eq!(binding, Binding::param(Location::Query, "limit"));
//!
//! assert_eq!(parse_tag("payload", Some("body")).unwrap(), Binding::Body);
//! ```

use std::fmt;

use http::HeaderName;

use crate::error::CompileError;

/// Request location a parameter binding reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    /// URL query string
    Query,
    /// Router path capture (e.g. `/users/{id}`)
    Path,
    /// Request header
    Header,
    /// Request cookie
    Cookie,
}

impl Location {
    /// Returns the descriptor keyword for this location.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Path => "path",
            Self::Header => "header",
            Self::Cookie => "cookie",
        }
    }

    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "query" => Some(Self::Query),
            "path" => Some(Self::Path),
            "header" => Some(Self::Header),
            "cookie" => Some(Self::Cookie),
            _ => None,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed field descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// The field is read from (or written to) a named parameter.
    Param {
        /// Where the parameter lives
        location: Location,
        /// Parameter name
        name: String,
    },
    /// The field holds the whole JSON body.
    Body,
}

impl Binding {
    /// Creates a parameter binding.
    #[must_use]
    pub fn param(location: Location, name: impl Into<String>) -> Self {
        Self::Param {
            location,
            name: name.into(),
        }
    }

    /// Returns true for the body binding.
    #[must_use]
    pub fn is_body(&self) -> bool {
        matches!(self, Self::Body)
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Param { location, name } => write!(f, "{location} parameter '{name}'"),
            Self::Body => f.write_str("body"),
        }
    }
}

/// Returns the default parameter name for a field identifier.
///
/// Raw identifiers lose their `r#` prefix before lower-casing.
#[must_use]
pub fn default_name(field: &str) -> String {
    field.strip_prefix("r#").unwrap_or(field).to_lowercase()
}

/// Parses the `http` descriptor of `field`.
///
/// Tokens are trimmed of surrounding whitespace before they are interpreted.
///
/// # Errors
///
/// Returns [`CompileError`] when the descriptor is missing, blank, has empty
/// or too many tokens, names an unknown source, gives `body` a name, or names
/// a header that is not a valid HTTP header name.
pub fn parse_tag(field: &str, tag: Option<&str>) -> Result<Binding, CompileError> {
    let Some(tag) = tag else {
        return Err(CompileError::MissingTag {
            field: field.to_string(),
        });
    };

    if tag.trim().is_empty() {
        return Err(CompileError::NoTokens {
            field: field.to_string(),
        });
    }

    let illegal = || CompileError::IllegalTag {
        field: field.to_string(),
        tag: tag.to_string(),
    };

    let tokens: Vec<&str> = tag.split(',').map(str::trim).collect();
    if tokens.len() > 2 || tokens.iter().any(|token| token.is_empty()) {
        return Err(illegal());
    }

    if tokens[0] == "body" {
        return if tokens.len() == 1 {
            Ok(Binding::Body)
        } else {
            Err(illegal())
        };
    }

    let location = Location::from_keyword(tokens[0]).ok_or_else(illegal)?;
    let name = tokens
        .get(1)
        .map_or_else(|| default_name(field), |name| (*name).to_string());

    if location == Location::Header && HeaderName::from_bytes(name.as_bytes()).is_err() {
        return Err(illegal());
    }

    Ok(Binding::Param { location, name })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_names() {
        assert_eq!(
            parse_tag("Field", Some("query,q")).unwrap(),
            Binding::param(Location::Query, "q")
        );
        assert_eq!(
            parse_tag("Field", Some("path,id")).unwrap(),
            Binding::param(Location::Path, "id")
        );
        assert_eq!(
            parse_tag("Field", Some("header,X-Trace")).unwrap(),
            Binding::param(Location::Header, "X-Trace")
        );
        assert_eq!(
            parse_tag("Field", Some("cookie,session")).unwrap(),
            Binding::param(Location::Cookie, "session")
        );
    }

    #[test]
    fn test_default_name_is_lowercased_field() {
        assert_eq!(
            parse_tag("MyField", Some("query")).unwrap(),
            Binding::param(Location::Query, "myfield")
        );
        assert_eq!(
            parse_tag("r#type", Some("header")).unwrap(),
            Binding::param(Location::Header, "type")
        );
    }

    #[test]
    fn test_tokens_are_trimmed() {
        assert_eq!(
            parse_tag("f", Some(" query , limit ")).unwrap(),
            Binding::param(Location::Query, "limit")
        );
        assert_eq!(parse_tag("f", Some(" body ")).unwrap(), Binding::Body);
    }

    #[test]
    fn test_body() {
        assert!(parse_tag("payload", Some("body")).unwrap().is_body());
    }

    #[test]
    fn test_missing_tag() {
        let err = parse_tag("Name", None).unwrap_err();
        assert_eq!(err.to_string(), "missing 'http' tag for field 'Name'");
    }

    #[test]
    fn test_no_tokens() {
        for tag in ["", "   "] {
            let err = parse_tag("Name", Some(tag)).unwrap_err();
            assert_eq!(err.to_string(), "illegal 'http' tag for field 'Name': no tokens");
        }
    }

    #[test]
    fn test_illegal_tags() {
        for tag in [
            "query,a,b",
            "query,",
            ",name",
            "body,payload",
            "form",
            "Query",
            "header,bad header",
        ] {
            let err = parse_tag("Name", Some(tag)).unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("illegal 'http' tag for field 'Name': {tag}"),
                "tag {tag:?}"
            );
        }
    }

    #[test]
    fn test_binding_display() {
        assert_eq!(
            Binding::param(Location::Cookie, "sid").to_string(),
            "cookie parameter 'sid'"
        );
        assert_eq!(Binding::Body.to_string(), "body");
    }
}
