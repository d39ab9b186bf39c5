//! # Bindery Codec
//!
//! Tag-driven request decoding and response encoding for Bindery services.
//!
//! Request and response messages are plain structs whose fields carry an
//! `http` descriptor naming where each value lives. A codec walks those
//! descriptors once, when the message type is registered, and compiles them
//! into an immutable list of field bindings. Decoding and encoding then only
//! move data.
//!
//! | Descriptor | Source | Supported field types |
//! |------------|--------|-----------------------|
//! | `query[,name]` | URL query string | scalar, `Option<_>`, `Vec<_>` |
//! | `header[,name]` | request headers | scalar, `Option<_>`, `Vec<_>` |
//! | `cookie[,name]` | `cookie` headers | scalar, `Option<_>` |
//! | `path[,name]` | router path captures | scalar, `Option<_>` |
//! | `body` | JSON request body | any `DeserializeOwned` type |
//!
//! Scalars are `bool`, the integer types, `f32`, `f64` and `String`.
//!
//! ## Example
//!
//! ```rust
//! use bindery_codec::{
//!     json::read_json, FieldDef, FieldTag, FieldType, HttpRequest, RequestCodec, RequestParts,
//! };
//! use serde::Deserialize;
//!
//! #[derive(Debug, Default, Deserialize)]
//! struct NewUser {
//!     name: String,
//! }
//!
//! #[derive(Debug, Default)]
//! struct CreateUser {
//!     org: String,
//!     user: NewUser,
//! }
//!
//! impl HttpRequest for CreateUser {
//!     fn fields() -> Vec<FieldDef<Self>> {
//!         vec![
//!             FieldDef::value(
//!                 FieldTag::new("org", Some("path")),
//!                 <String as FieldType>::shape(),
//!                 |target: &mut Self, values: Option<&[&str]>| {
//!                     target.org = <String as FieldType>::inject(values)?;
//!                     Ok(())
//!                 },
//!             ),
//!             FieldDef::json(
//!                 FieldTag::new("user", Some("body")),
//!                 std::any::type_name::<NewUser>(),
//!                 |target: &mut Self, bytes: &[u8]| {
//!                     target.user = read_json(bytes)?;
//!                     Ok(())
//!                 },
//!             ),
//!         ]
//!     }
//! }
//!
//! let codec = RequestCodec::<CreateUser>::compile().unwrap();
//! let parts = RequestParts::builder()
//!     .path_param("org", "acme")
//!     .header("content-type", "application/json")
//!     .body(r#"{"name": "Alice"}"#)
//!     .build();
//!
//! let request = codec.decode(&parts).unwrap();
//! assert_eq!(request.org, "acme");
//! assert_eq!(request.user.name, "Alice");
//! ```
//!
//! In practice the [`HttpRequest`] and [`HttpResponse`] implementations are
//! derived with `bindery-macros`.

#![doc(html_root_url = "https://docs.rs/bindery-codec/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod codec;
pub mod coerce;
mod error;
mod inject;
pub mod json;
mod message;
mod params;
mod request;
mod source;
pub mod tag;

pub use codec::{FieldBinding, FieldEmission, RequestCodec, ResponseCodec, APPLICATION_JSON};
pub use coerce::{CoerceError, Scalar, ScalarKind, ScalarValue};
pub use error::{
    status_of, BoxError, CompileError, DecodeError, EncodeError, HttpError, ParseRequestError,
};
pub use inject::{FieldType, Shape};
pub use json::{JsonError, JsonFormat};
pub use message::{FieldDef, FieldSlot, FieldTag, HttpRequest, HttpResponse, InjectFn, ReadJsonFn};
pub use params::PathParams;
pub use request::{QueryValues, RequestParts, RequestPartsBuilder};
pub use source::Source;
pub use tag::{Binding, Location};
