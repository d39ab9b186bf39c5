//! JSON body reading and writing.
//!
//! Bodies are read strictly: any property the target type does not declare,
//! at any depth, is rejected even when the type itself would silently skip it.

use mime::Mime;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Output layout of encoded JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Two-space indentation
    #[default]
    Pretty,
    /// No insignificant whitespace
    Compact,
}

/// Error raised while reading a JSON body.
#[derive(Debug, Error)]
pub enum JsonError {
    /// The body is not valid JSON for the target type.
    #[error("{0}")]
    Syntax(#[from] serde_json::Error),

    /// The body holds a property the target type does not declare.
    #[error("unknown field '{0}'")]
    UnknownField(String),
}

/// Returns true if `content_type` names `application/json`.
///
/// Media type parameters such as `charset` are allowed.
#[must_use]
pub fn is_json(content_type: &str) -> bool {
    content_type
        .parse::<Mime>()
        .is_ok_and(|mime| mime.essence_str() == mime::APPLICATION_JSON.essence_str())
}

/// Reads a complete JSON document into `V`.
///
/// # Errors
///
/// Returns [`JsonError::Syntax`] for malformed JSON, a type mismatch or
/// trailing data, and [`JsonError::UnknownField`] for the first property the
/// target type does not declare.
///
/// # Example
///
/// ```rust
/// use bindery_codec::json::{read_json, JsonError};
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize)]
/// struct User {
///     name: String,
/// }
///
/// let user: User = read_json(br#"{"name": "Alice"}"#).unwrap();
/// assert_eq!(user.name, "Alice");
///
/// let err = read_json::<User>(br#"{"name": "Alice", "admin": true}"#).unwrap_err();
/// assert!(matches!(err, JsonError::UnknownField(path) if path == "admin"));
/// ```
pub fn read_json<V: DeserializeOwned>(bytes: &[u8]) -> Result<V, JsonError> {
    let mut unknown: Option<String> = None;
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);

    let value: V = serde_ignored::deserialize(&mut deserializer, |path| {
        if unknown.is_none() {
            unknown = Some(path.to_string());
        }
    })?;
    deserializer.end()?;

    match unknown {
        Some(path) => Err(JsonError::UnknownField(path)),
        None => Ok(value),
    }
}

/// Writes `value` as JSON followed by a newline.
///
/// # Errors
///
/// Returns an error if `value` fails to serialize.
pub fn write_json<T: Serialize + ?Sized>(
    value: &T,
    format: JsonFormat,
) -> Result<Vec<u8>, serde_json::Error> {
    let mut buffer = match format {
        JsonFormat::Pretty => serde_json::to_vec_pretty(value)?,
        JsonFormat::Compact => serde_json::to_vec(value)?,
    };
    buffer.push(b'\n');
    Ok(buffer)
}

/// Strips module paths from a Rust type name.
///
/// `alloc::vec::Vec<my_app::User>` becomes `Vec<User>`.
#[must_use]
pub fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    for c in full.chars() {
        if c.is_alphanumeric() || c == '_' || c == ':' {
            segment.push(c);
        } else {
            out.push_str(segment.rsplit("::").next().unwrap_or_default());
            segment.clear();
            out.push(c);
        }
    }
    out.push_str(segment.rsplit("::").next().unwrap_or_default());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Inner {
        value: i32,
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Outer {
        name: String,
        #[serde(default)]
        inner: Inner,
    }

    #[test]
    fn test_is_json() {
        assert!(is_json("application/json"));
        assert!(is_json("application/json; charset=utf-8"));
        assert!(is_json("Application/JSON"));
        assert!(!is_json("text/plain"));
        assert!(!is_json("application/unknown"));
        assert!(!is_json(""));
    }

    #[test]
    fn test_read_json() {
        let outer: Outer = read_json(br#"{"name":"a","inner":{"value":3}}"#).unwrap();
        assert_eq!(
            outer,
            Outer {
                name: "a".into(),
                inner: Inner { value: 3 }
            }
        );
    }

    #[test]
    fn test_read_json_rejects_nested_unknown_field() {
        let err = read_json::<Outer>(br#"{"name":"a","inner":{"value":3,"extra":1}}"#)
            .unwrap_err();
        assert_eq!(err.to_string(), "unknown field 'inner.extra'");
    }

    #[test]
    fn test_read_json_rejects_trailing_data() {
        assert!(matches!(
            read_json::<Inner>(br#"{"value":1} {"value":2}"#),
            Err(JsonError::Syntax(_))
        ));
    }

    #[test]
    fn test_read_json_rejects_malformed() {
        assert!(matches!(
            read_json::<Inner>(br#"{"value":"#),
            Err(JsonError::Syntax(_))
        ));
        assert!(matches!(
            read_json::<Inner>(br#"{"value":"x"}"#),
            Err(JsonError::Syntax(_))
        ));
    }

    #[test]
    fn test_write_json_formats() {
        let value = serde_json::json!({ "P": "<v>" });
        assert_eq!(
            write_json(&value, JsonFormat::Pretty).unwrap(),
            b"{\n  \"P\": \"<v>\"\n}\n"
        );
        assert_eq!(
            write_json(&value, JsonFormat::Compact).unwrap(),
            b"{\"P\":\"<v>\"}\n"
        );
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("my_app::api::User"), "User");
        assert_eq!(
            short_type_name("alloc::vec::Vec<my_app::User>"),
            "Vec<User>"
        );
        assert_eq!(
            short_type_name("std::collections::HashMap<alloc::string::String, i32>"),
            "HashMap<String, i32>"
        );
        assert_eq!(short_type_name("u8"), "u8");
    }
}
