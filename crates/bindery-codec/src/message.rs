//! Message traits implemented by request and response types.
//!
//! These traits are normally derived with `#[derive(HttpRequest)]` and
//! `#[derive(HttpResponse)]` from `bindery-macros`. A derived implementation
//! lists one entry per struct field, in declaration order, carrying the raw
//! `#[http("...")]` descriptor and a typed setter. Descriptors are not
//! interpreted here: [`RequestCodec::compile`](crate::RequestCodec::compile)
//! parses and validates them once.

use serde::Serialize;

use crate::coerce::CoerceError;
use crate::inject::Shape;
use crate::json::JsonError;

/// Raw descriptor of one message field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldTag {
    /// Rust field identifier
    pub ident: &'static str,
    /// Raw `http` descriptor, if the field has one
    pub tag: Option<&'static str>,
}

impl FieldTag {
    /// Creates a field descriptor.
    #[must_use]
    pub const fn new(ident: &'static str, tag: Option<&'static str>) -> Self {
        Self { ident, tag }
    }
}

/// Setter injecting parameter values into a field of `T`.
pub type InjectFn<T> = fn(&mut T, Option<&[&str]>) -> Result<(), CoerceError>;

/// Setter reading a JSON body into a field of `T`.
pub type ReadJsonFn<T> = fn(&mut T, &[u8]) -> Result<(), JsonError>;

/// How a field of `T` receives its value.
pub enum FieldSlot<T> {
    /// A parameter-capable field (scalar, `Option<_>` or `Vec<_>`).
    Value {
        /// Shape of the field type
        shape: Shape,
        /// Setter
        inject: InjectFn<T>,
    },
    /// A field that receives the whole JSON body.
    Json {
        /// Full Rust type name of the field
        type_name: &'static str,
        /// Setter
        read: ReadJsonFn<T>,
    },
    /// A field without a descriptor.
    Unbound,
}

impl<T> std::fmt::Debug for FieldSlot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value { shape, .. } => f.debug_struct("Value").field("shape", shape).finish(),
            Self::Json { type_name, .. } => {
                f.debug_struct("Json").field("type_name", type_name).finish()
            }
            Self::Unbound => f.write_str("Unbound"),
        }
    }
}

/// One field of a request message.
#[derive(Debug)]
pub struct FieldDef<T> {
    /// Field descriptor
    pub tag: FieldTag,
    /// Setter for the field
    pub slot: FieldSlot<T>,
}

impl<T> FieldDef<T> {
    /// A field filled from query, path, header or cookie values.
    #[must_use]
    pub fn value(tag: FieldTag, shape: Shape, inject: InjectFn<T>) -> Self {
        Self {
            tag,
            slot: FieldSlot::Value { shape, inject },
        }
    }

    /// A field filled from the JSON body.
    #[must_use]
    pub fn json(tag: FieldTag, type_name: &'static str, read: ReadJsonFn<T>) -> Self {
        Self {
            tag,
            slot: FieldSlot::Json { type_name, read },
        }
    }

    /// A field without a descriptor.
    #[must_use]
    pub fn unbound(ident: &'static str) -> Self {
        Self {
            tag: FieldTag::new(ident, None),
            slot: FieldSlot::Unbound,
        }
    }
}

/// A request message decoded from HTTP requests.
///
/// Decoding starts from `Self::default()` and then sets every field from its
/// bound source.
///
/// # Example
///
/// A hand-written implementation equivalent to the derive:
///
/// ```rust
/// use bindery_codec::{FieldDef, FieldTag, FieldType, HttpRequest};
///
/// #[derive(Debug, Default)]
/// struct GetUser {
///     id: u64,
/// }
///
/// impl HttpRequest for GetUser {
///     fn fields() -> Vec<FieldDef<Self>> {
///         vec![FieldDef::value(
///             FieldTag::new("id", Some("path")),
///             <u64 as FieldType>::shape(),
///             |target: &mut Self, values: Option<&[&str]>| {
///                 target.id = <u64 as FieldType>::inject(values)?;
///                 Ok(())
///             },
///         )]
///     }
/// }
/// ```
pub trait HttpRequest: Default + Send + 'static {
    /// Returns the fields of this message in declaration order.
    fn fields() -> Vec<FieldDef<Self>>;
}

/// A response message encoded onto HTTP responses.
///
/// The whole value is serialized as the JSON body; the descriptors are
/// validated with the same grammar as requests.
pub trait HttpResponse: Serialize + Send + 'static {
    /// Returns the field descriptors of this message in declaration order.
    fn fields() -> Vec<FieldTag>;
}
