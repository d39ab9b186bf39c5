//! Request data handed to the decoder.
//!
//! [`RequestParts`] gathers everything a [`RequestCodec`](crate::RequestCodec)
//! reads: the URI (for the query string), headers (including cookies), the
//! collected body and the path captures produced by the router.

use bytes::Bytes;
use http::header::{self, HeaderName, ToStrError};
use http::{HeaderMap, Method, Uri};

use crate::params::PathParams;

/// The parts of an HTTP request the decoder reads from.
///
/// # Example
///
/// ```rust
/// use bindery_codec::{PathParams, RequestParts};
/// use bytes::Bytes;
/// use http::{HeaderMap, Method, Uri};
///
/// let mut params = PathParams::new();
/// params.push("id", "123");
///
/// let parts = RequestParts::new(
///     Method::GET,
///     Uri::from_static("/users/123?active=true"),
///     HeaderMap::new(),
///     Bytes::new(),
///     params,
/// );
///
/// assert_eq!(parts.path(), "/users/123");
/// assert_eq!(parts.query_string(), Some("active=true"));
/// assert_eq!(parts.path_params().get("id"), Some("123"));
/// ```
#[derive(Debug, Clone)]
pub struct RequestParts {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    path_params: PathParams,
}

impl RequestParts {
    /// Creates request parts.
    #[must_use]
    pub fn new(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
        path_params: PathParams,
    ) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
            path_params,
        }
    }

    /// Creates request parts from a split `http` request.
    #[must_use]
    pub fn from_http(parts: http::request::Parts, body: Bytes, path_params: PathParams) -> Self {
        Self::new(parts.method, parts.uri, parts.headers, body, path_params)
    }

    /// Returns a builder.
    #[must_use]
    pub fn builder() -> RequestPartsBuilder {
        RequestPartsBuilder::new()
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the path portion of the URI.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Returns the raw query string, if present.
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the collected body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the router's path captures.
    #[must_use]
    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    /// Returns the first value of a header as a string.
    #[must_use]
    pub fn header(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns every value of a header, or `None` if the header is absent.
    ///
    /// # Errors
    ///
    /// Returns [`ToStrError`] if a value contains bytes that are not visible
    /// ASCII.
    pub fn header_values(&self, name: &HeaderName) -> Result<Option<Vec<&str>>, ToStrError> {
        if !self.headers.contains_key(name) {
            return Ok(None);
        }
        self.headers
            .get_all(name)
            .iter()
            .map(|value| value.to_str())
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    /// Returns the raw `content-type` header.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header(header::CONTENT_TYPE)
    }

    /// Returns the raw `accept` header.
    #[must_use]
    pub fn accept(&self) -> Option<&str> {
        self.header(header::ACCEPT)
    }

    /// Returns the first cookie named `name` across all `cookie` headers.
    ///
    /// Surrounding double quotes are removed from the value.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(n, _)| n.trim() == name)
            .map(|(_, value)| value.trim().trim_matches('"'))
    }

    /// Parses the query string into grouped values.
    #[must_use]
    pub fn query(&self) -> QueryValues {
        QueryValues::parse(self.query_string().unwrap_or_default())
    }
}

/// Query parameters grouped by name, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryValues {
    entries: Vec<(String, Vec<String>)>,
}

impl QueryValues {
    /// Parses a raw query string.
    ///
    /// Decoding is lenient: a malformed `%` escape is kept as written and
    /// bytes that are not UTF-8 become U+FFFD.
    #[must_use]
    pub fn parse(query: &str) -> Self {
        // String pairs always deserialize; the form parser never rejects input.
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap_or_default();

        let mut entries: Vec<(String, Vec<String>)> = Vec::new();
        for (name, value) in pairs {
            match entries.iter_mut().find(|(n, _)| *n == name) {
                Some((_, values)) => values.push(value),
                None => entries.push((name, vec![value])),
            }
        }
        Self { entries }
    }

    /// Returns every value of `name` in order, or `None` if it is absent.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Vec<&str>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.iter().map(String::as_str).collect())
    }

    /// Returns true if no parameter was given.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builder for [`RequestParts`], mostly useful in tests.
#[derive(Debug, Default)]
pub struct RequestPartsBuilder {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    path_params: PathParams,
}

impl RequestPartsBuilder {
    /// Creates a builder for `GET /`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the URI.
    #[must_use]
    pub fn uri(mut self, uri: Uri) -> Self {
        self.uri = uri;
        self
    }

    /// Appends a header. Invalid names or values are skipped.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            header::HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Adds a path capture.
    #[must_use]
    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.push(name, value);
        self
    }

    /// Builds the request parts.
    #[must_use]
    pub fn build(self) -> RequestParts {
        RequestParts::new(
            self.method,
            self.uri,
            self.headers,
            self.body,
            self.path_params,
        )
    }
}
