//! Codec error types.
//!
//! Errors fall into two groups: [`CompileError`] is raised once, while a
//! message type is analysed at registration; [`ParseRequestError`] and
//! [`EncodeError`] are raised per request. Negotiation failures carry an
//! [`HttpError`] in their source chain so the endpoint can recover the status
//! code with [`status_of`].

use std::error::Error as StdError;
use std::fmt;

use http::StatusCode;
use thiserror::Error;

use crate::coerce::CoerceError;
use crate::json::JsonError;
use crate::tag::Location;

/// Boxed error type used for handler and HTTP error causes.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Error raised while compiling a codec for a message type.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The field has no `http` descriptor.
    #[error("missing 'http' tag for field '{field}'")]
    MissingTag {
        /// Field name
        field: String,
    },

    /// The descriptor is empty.
    #[error("illegal 'http' tag for field '{field}': no tokens")]
    NoTokens {
        /// Field name
        field: String,
    },

    /// The descriptor does not follow the grammar.
    #[error("illegal 'http' tag for field '{field}': {tag}")]
    IllegalTag {
        /// Field name
        field: String,
        /// Raw descriptor
        tag: String,
    },

    /// Two fields claim the request body.
    #[error("fields '{first}' and '{second}' are both bound to the body")]
    DuplicateBody {
        /// First body field
        first: String,
        /// Second body field
        second: String,
    },

    /// The field type cannot be read from its location.
    #[error("injecting {location} parameters into fields of type '{shape}' is not supported (field '{field}')")]
    UnsupportedShape {
        /// Field name
        field: String,
        /// Parameter location
        location: Location,
        /// Rendered field type
        shape: String,
    },

    /// The field's declared slot disagrees with its descriptor.
    #[error("field '{field}' cannot be bound to {binding}")]
    SlotMismatch {
        /// Field name
        field: String,
        /// Rendered binding
        binding: String,
    },
}

/// Error raised while decoding a single field of a request.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A path capture is missing or empty.
    #[error("empty value for path parameter '{name}', required for field '{field}'")]
    EmptyPathParameter {
        /// Path parameter name
        name: String,
        /// Field name
        field: String,
    },

    /// A parameter value could not be coerced into the field type.
    #[error("invalid {location} parameter '{name}' for field '{field}': {source}")]
    Coerce {
        /// Parameter location
        location: Location,
        /// Parameter name
        name: String,
        /// Field name
        field: String,
        /// Coercion failure
        source: CoerceError,
    },

    /// A header value contains bytes that are not visible ASCII.
    #[error("invalid header '{name}' for field '{field}': {source}")]
    InvalidHeader {
        /// Header name
        name: String,
        /// Field name
        field: String,
        /// Conversion failure
        source: http::header::ToStrError,
    },

    /// Content negotiation failed.
    #[error("{0}")]
    Http(#[from] HttpError),

    /// The body could not be read into the target type.
    #[error("failed reading JSON into '{type_name}': {source}")]
    Json {
        /// Target type name
        type_name: String,
        /// JSON failure
        source: JsonError,
    },
}

/// Error returned by [`RequestCodec::decode`](crate::RequestCodec::decode).
#[derive(Debug, Error)]
#[error("failed parsing request: {source}")]
pub struct ParseRequestError {
    source: DecodeError,
}

impl ParseRequestError {
    /// Returns the field-level failure.
    #[must_use]
    pub fn decode_error(&self) -> &DecodeError {
        &self.source
    }

    /// Returns the HTTP status carried by this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        status_of(self)
    }
}

impl From<DecodeError> for ParseRequestError {
    fn from(source: DecodeError) -> Self {
        Self { source }
    }
}

/// Error returned by [`ResponseCodec::encode`](crate::ResponseCodec::encode).
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Content negotiation failed.
    #[error("{0}")]
    Http(#[from] HttpError),

    /// The response could not be serialized.
    #[error("failed encoding JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl EncodeError {
    /// Returns the HTTP status carried by this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        status_of(self)
    }
}

/// An error that declares the HTTP status it should be answered with.
///
/// Handlers return it (directly or anywhere in an error's source chain) to
/// pick the response status; any other error is answered with 500.
///
/// # Example
///
/// ```rust
/// use bindery_codec::HttpError;
/// use http::StatusCode;
///
/// let err = HttpError::new(StatusCode::NOT_FOUND, "no such user");
/// assert_eq!(err.status(), StatusCode::NOT_FOUND);
/// assert_eq!(err.to_string(), "404: no such user");
/// ```
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    cause: Option<BoxError>,
}

impl HttpError {
    /// Creates an error with a status and a cause.
    pub fn new(status: StatusCode, cause: impl Into<BoxError>) -> Self {
        Self {
            status,
            cause: Some(cause.into()),
        }
    }

    /// Creates an error carrying only a status.
    #[must_use]
    pub fn from_status(status: StatusCode) -> Self {
        Self {
            status,
            cause: None,
        }
    }

    /// 415 for a request `content-type` the codec cannot read.
    #[must_use]
    pub fn unsupported_media_type(media_type: &str) -> Self {
        Self::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            format!("'{media_type}' is not supported"),
        )
    }

    /// 406 for an `accept` media type the codec cannot write.
    #[must_use]
    pub fn not_acceptable(media_type: &str) -> Self {
        Self::new(
            StatusCode::NOT_ACCEPTABLE,
            format!("'{media_type}' is not supported"),
        )
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the cause, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {cause}", self.status.as_u16()),
            None => write!(f, "{}", self.status.as_u16()),
        }
    }
}

impl StdError for HttpError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn StdError + 'static))
    }
}

/// Returns the status of the first [`HttpError`] in `err`'s source chain.
///
/// # Example
///
/// ```rust
/// use bindery_codec::{status_of, HttpError};
/// use http::StatusCode;
///
/// let err = HttpError::from_status(StatusCode::CONFLICT);
/// assert_eq!(status_of(&err), Some(StatusCode::CONFLICT));
///
/// let plain = std::io::Error::other("boom");
/// assert_eq!(status_of(&plain), None);
/// ```
pub fn status_of(err: &(dyn StdError + 'static)) -> Option<StatusCode> {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(http) = err.downcast_ref::<HttpError>() {
            return Some(http.status());
        }
        current = err.source();
    }
    None
}
