//! Compiled request decoders and response encoders.
//!
//! A codec is compiled once per message type, when a method is registered.
//! Compilation parses every field descriptor and resolves it to a source; any
//! problem is reported then as a [`CompileError`]. The compiled codec is
//! immutable and can be shared freely between concurrent requests.
//!
//! # Example
//!
//! ```rust
//! use bindery_codec::{FieldDef, FieldTag, FieldType, HttpRequest, RequestCodec, RequestParts};
//! use http::Uri;
//!
//! #[derive(Debug, Default)]
//! struct ListUsers {
//!     limit: Option<u32>,
//! }
//!
//! impl HttpRequest for ListUsers {
//!     fn fields() -> Vec<FieldDef<Self>> {
//!         vec![FieldDef::value(
//!             FieldTag::new("limit", Some("query")),
//!             <Option<u32> as FieldType>::shape(),
//!             |target: &mut Self, values: Option<&[&str]>| {
//!                 target.limit = <Option<u32> as FieldType>::inject(values)?;
//!                 Ok(())
//!             },
//!         )]
//!     }
//! }
//!
//! let codec = RequestCodec::<ListUsers>::compile().unwrap();
//!
//! let parts = RequestParts::builder().uri(Uri::from_static("/users?limit=10")).build();
//! assert_eq!(codec.decode(&parts).unwrap().limit, Some(10));
//!
//! let parts = RequestParts::builder().uri(Uri::from_static("/users")).build();
//! assert_eq!(codec.decode(&parts).unwrap().limit, None);
//! ```

use std::fmt;
use std::marker::PhantomData;

use bytes::Bytes;

use crate::error::{CompileError, DecodeError, EncodeError, HttpError, ParseRequestError};
use crate::inject::Shape;
use crate::json::{is_json, short_type_name, write_json, JsonFormat};
use crate::message::{FieldSlot, HttpRequest, HttpResponse, InjectFn, ReadJsonFn};
use crate::request::{QueryValues, RequestParts};
use crate::source::Source;
use crate::tag::{parse_tag, Binding, Location};

/// The only media type the codecs read and write.
pub const APPLICATION_JSON: &str = "application/json";

enum Target<T> {
    Param {
        source: Source,
        shape: Shape,
        inject: InjectFn<T>,
    },
    Body {
        type_name: String,
        read: ReadJsonFn<T>,
    },
}

/// Compiled binding of one request field.
pub struct FieldBinding<T> {
    index: usize,
    field: &'static str,
    target: Target<T>,
}

impl<T> FieldBinding<T> {
    /// Returns the declared position of the field.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the field name.
    #[must_use]
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Returns the parameter source, or `None` for the body field.
    #[must_use]
    pub fn source(&self) -> Option<&Source> {
        match &self.target {
            Target::Param { source, .. } => Some(source),
            Target::Body { .. } => None,
        }
    }

    /// Returns the shape of a parameter field.
    #[must_use]
    pub fn shape(&self) -> Option<&Shape> {
        match &self.target {
            Target::Param { shape, .. } => Some(shape),
            Target::Body { .. } => None,
        }
    }

    /// Returns true if the field receives the JSON body.
    #[must_use]
    pub fn is_body(&self) -> bool {
        matches!(self.target, Target::Body { .. })
    }

    fn apply(
        &self,
        target: &mut T,
        parts: &RequestParts,
        query: &QueryValues,
    ) -> Result<(), DecodeError> {
        match &self.target {
            Target::Param { source, inject, .. } => {
                let values = source.values(parts, query, self.field)?;
                inject(target, values.as_deref()).map_err(|cause| DecodeError::Coerce {
                    location: source.location(),
                    name: source.name().to_string(),
                    field: self.field.to_string(),
                    source: cause,
                })
            }
            Target::Body { type_name, read } => {
                let content_type = parts.content_type().unwrap_or_default();
                if !is_json(content_type) {
                    return Err(HttpError::unsupported_media_type(content_type).into());
                }
                if parts.body().is_empty() {
                    return Ok(());
                }
                read(target, parts.body()).map_err(|source| DecodeError::Json {
                    type_name: type_name.clone(),
                    source,
                })
            }
        }
    }
}

impl<T> fmt::Debug for FieldBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("FieldBinding");
        s.field("index", &self.index).field("field", &self.field);
        match &self.target {
            Target::Param { source, shape, .. } => s.field("source", source).field("shape", shape),
            Target::Body { type_name, .. } => s.field("body", type_name),
        };
        s.finish()
    }
}

/// Checks that at most one field claims the body.
fn claim_body(
    body_field: &mut Option<&'static str>,
    field: &'static str,
) -> Result<(), CompileError> {
    if let Some(first) = *body_field {
        return Err(CompileError::DuplicateBody {
            first: first.to_string(),
            second: field.to_string(),
        });
    }
    *body_field = Some(field);
    Ok(())
}

/// Decoder turning HTTP requests into `T`.
pub struct RequestCodec<T> {
    type_name: String,
    bindings: Vec<FieldBinding<T>>,
    reads_query: bool,
}

impl<T: HttpRequest> RequestCodec<T> {
    /// Compiles the decoder for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] if a descriptor is missing or malformed, two
    /// fields claim the body, or a field type cannot be read from its
    /// location (a `Vec` bound to a path capture or a cookie).
    pub fn compile() -> Result<Self, CompileError> {
        let mut bindings = Vec::new();
        let mut body_field = None;

        for (index, def) in T::fields().into_iter().enumerate() {
            let field = def.tag.ident;
            let binding = parse_tag(field, def.tag.tag)?;

            let target = match (binding, def.slot) {
                (Binding::Body, FieldSlot::Json { type_name, read }) => {
                    claim_body(&mut body_field, field)?;
                    Target::Body {
                        type_name: short_type_name(type_name),
                        read,
                    }
                }
                (Binding::Param { location, name }, FieldSlot::Value { shape, inject }) => {
                    if matches!(location, Location::Path | Location::Cookie) && shape.is_repeated()
                    {
                        return Err(CompileError::UnsupportedShape {
                            field: field.to_string(),
                            location,
                            shape: shape.to_string(),
                        });
                    }
                    let raw_tag = def.tag.tag.unwrap_or_default();
                    Target::Param {
                        source: Source::resolve(field, raw_tag, location, name)?,
                        shape,
                        inject,
                    }
                }
                (binding, _) => {
                    return Err(CompileError::SlotMismatch {
                        field: field.to_string(),
                        binding: binding.to_string(),
                    })
                }
            };

            bindings.push(FieldBinding {
                index,
                field,
                target,
            });
        }

        let reads_query = bindings
            .iter()
            .any(|b| matches!(b.source(), Some(Source::Query(_))));

        Ok(Self {
            type_name: short_type_name(std::any::type_name::<T>()),
            bindings,
            reads_query,
        })
    }

    /// Decodes a request.
    ///
    /// Fields are set in declaration order starting from `T::default()`; the
    /// first failing field aborts decoding.
    ///
    /// # Errors
    ///
    /// Returns [`ParseRequestError`] wrapping the first field failure. An
    /// unsupported body `content-type` carries a 415 [`HttpError`].
    pub fn decode(&self, parts: &RequestParts) -> Result<T, ParseRequestError> {
        let query = if self.reads_query {
            parts.query()
        } else {
            QueryValues::default()
        };

        let mut target = T::default();
        for binding in &self.bindings {
            binding.apply(&mut target, parts, &query)?;
        }
        Ok(target)
    }
}

impl<T> RequestCodec<T> {
    /// Returns the short name of the target type.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the compiled bindings in declaration order.
    #[must_use]
    pub fn bindings(&self) -> &[FieldBinding<T>] {
        &self.bindings
    }
}

impl<T> fmt::Debug for RequestCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCodec")
            .field("type_name", &self.type_name)
            .field("bindings", &self.bindings)
            .finish()
    }
}

/// Validated descriptor of one response field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEmission {
    /// Declared position of the field
    pub index: usize,
    /// Field name
    pub field: &'static str,
    /// Parsed binding
    pub binding: Binding,
}

/// Encoder writing `T` onto HTTP responses.
pub struct ResponseCodec<T> {
    type_name: String,
    emissions: Vec<FieldEmission>,
    _marker: PhantomData<fn(&T)>,
}

impl<T: HttpResponse> ResponseCodec<T> {
    /// Compiles the encoder for `T`, validating its field descriptors.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] if a descriptor is missing or malformed, or
    /// two fields claim the body.
    pub fn compile() -> Result<Self, CompileError> {
        let mut emissions = Vec::new();
        let mut body_field = None;

        for (index, tag) in T::fields().into_iter().enumerate() {
            let binding = parse_tag(tag.ident, tag.tag)?;
            if binding.is_body() {
                claim_body(&mut body_field, tag.ident)?;
            }
            emissions.push(FieldEmission {
                index,
                field: tag.ident,
                binding,
            });
        }

        Ok(Self {
            type_name: short_type_name(std::any::type_name::<T>()),
            emissions,
            _marker: PhantomData,
        })
    }

    /// Encodes a response body.
    ///
    /// An absent response produces no body, whatever `accept` says.
    /// Otherwise `accept` must be `application/json`.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::Http`] with 406 for any other `accept` value
    /// (including a missing one), or [`EncodeError::Json`] if serialization
    /// fails.
    pub fn encode(
        &self,
        response: Option<&T>,
        accept: Option<&str>,
        format: JsonFormat,
    ) -> Result<Option<Bytes>, EncodeError> {
        let Some(response) = response else {
            return Ok(None);
        };

        let accept = accept.unwrap_or_default();
        if accept.trim() != APPLICATION_JSON {
            return Err(HttpError::not_acceptable(accept).into());
        }

        Ok(Some(Bytes::from(write_json(response, format)?)))
    }
}

impl<T> ResponseCodec<T> {
    /// Returns the short name of the source type.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the validated field descriptors in declaration order.
    #[must_use]
    pub fn emissions(&self) -> &[FieldEmission] {
        &self.emissions
    }
}

impl<T> fmt::Debug for ResponseCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCodec")
            .field("type_name", &self.type_name)
            .field("emissions", &self.emissions)
            .finish()
    }
}
