//! Parameter sources.
//!
//! Each source pulls the raw textual values of one binding out of a request.
//! `None` means the parameter is absent; the injector turns that into the
//! field's zero value (or `None` for optional fields).

use std::fmt;

use http::HeaderName;

use crate::error::{CompileError, DecodeError};
use crate::request::{QueryValues, RequestParts};
use crate::tag::Location;

/// A resolved parameter source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// All values of a query parameter.
    Query(String),
    /// The single value of a path capture. Missing or empty is an error.
    Path(String),
    /// All values of a header.
    Header(HeaderName),
    /// The first cookie with this name.
    Cookie(String),
}

impl Source {
    /// Resolves a parsed parameter binding.
    pub(crate) fn resolve(
        field: &str,
        raw_tag: &str,
        location: Location,
        name: String,
    ) -> Result<Self, CompileError> {
        Ok(match location {
            Location::Query => Self::Query(name),
            Location::Path => Self::Path(name),
            Location::Cookie => Self::Cookie(name),
            Location::Header => Self::Header(HeaderName::from_bytes(name.as_bytes()).map_err(
                |_| CompileError::IllegalTag {
                    field: field.to_string(),
                    tag: raw_tag.to_string(),
                },
            )?),
        })
    }

    /// Returns the location of this source.
    #[must_use]
    pub fn location(&self) -> Location {
        match self {
            Self::Query(_) => Location::Query,
            Self::Path(_) => Location::Path,
            Self::Header(_) => Location::Header,
            Self::Cookie(_) => Location::Cookie,
        }
    }

    /// Returns the parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Query(name) | Self::Path(name) | Self::Cookie(name) => name,
            Self::Header(name) => name.as_str(),
        }
    }

    /// Extracts the raw values bound to `field`.
    pub(crate) fn values<'a>(
        &self,
        parts: &'a RequestParts,
        query: &'a QueryValues,
        field: &str,
    ) -> Result<Option<Vec<&'a str>>, DecodeError> {
        match self {
            Self::Query(name) => Ok(query.get(name)),
            Self::Path(name) => match parts.path_params().get(name) {
                Some(value) if !value.is_empty() => Ok(Some(vec![value])),
                _ => Err(DecodeError::EmptyPathParameter {
                    name: name.clone(),
                    field: field.to_string(),
                }),
            },
            Self::Header(name) => {
                parts
                    .header_values(name)
                    .map_err(|source| DecodeError::InvalidHeader {
                        name: name.to_string(),
                        field: field.to_string(),
                        source,
                    })
            }
            Self::Cookie(name) => Ok(parts.cookie(name).map(|value| vec![value])),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} parameter '{}'", self.location(), self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Uri;

    fn parts() -> RequestParts {
        RequestParts::builder()
            .uri(Uri::from_static("/items/7?tag=a&tag=b"))
            .header("x-ids", "1")
            .header("x-ids", "2")
            .header("cookie", "sid=s1; sid=s2")
            .path_param("id", "7")
            .path_param("blank", "")
            .build()
    }

    #[test]
    fn test_query_values() {
        let parts = parts();
        let query = parts.query();

        let values = Source::Query("tag".into()).values(&parts, &query, "Tags").unwrap();
        assert_eq!(values, Some(vec!["a", "b"]));

        let values = Source::Query("none".into()).values(&parts, &query, "None").unwrap();
        assert_eq!(values, None);
    }

    #[test]
    fn test_header_values() {
        let parts = parts();
        let query = parts.query();

        let source = Source::resolve("Ids", "header,X-Ids", Location::Header, "X-Ids".into())
            .unwrap();
        assert_eq!(source.name(), "x-ids");
        assert_eq!(
            source.values(&parts, &query, "Ids").unwrap(),
            Some(vec!["1", "2"])
        );
    }

    #[test]
    fn test_cookie_first_wins() {
        let parts = parts();
        let query = parts.query();

        let values = Source::Cookie("sid".into()).values(&parts, &query, "Sid").unwrap();
        assert_eq!(values, Some(vec!["s1"]));
        let values = Source::Cookie("other".into()).values(&parts, &query, "Other").unwrap();
        assert_eq!(values, None);
    }

    #[test]
    fn test_path_values() {
        let parts = parts();
        let query = parts.query();

        let values = Source::Path("id".into()).values(&parts, &query, "ID").unwrap();
        assert_eq!(values, Some(vec!["7"]));

        for name in ["blank", "missing"] {
            let err = Source::Path(name.into())
                .values(&parts, &query, "Field")
                .unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("empty value for path parameter '{name}', required for field 'Field'")
            );
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Source::Cookie("sid".into()).to_string(),
            "cookie parameter 'sid'"
        );
    }
}
