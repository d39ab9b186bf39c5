//! Derive macros for Bindery request and response messages.
//!
//! `#[derive(HttpRequest)]` and `#[derive(HttpResponse)]` implement the
//! message traits of `bindery-codec` for structs with named fields. Every
//! field names its HTTP source with an `#[http("...")]` attribute:
//!
//! ```rust,ignore
//! use bindery::prelude::*;
//!
//! #[derive(Debug, Default, HttpRequest)]
//! struct UpdateUser {
//!     #[http("path,id")]
//!     user_id: u64,
//!     #[http("header,if-match")]
//!     etag: Option<String>,
//!     #[http("query")]
//!     notify: bool,
//!     #[http("body")]
//!     user: UserPatch,
//! }
//!
//! #[derive(Debug, Serialize, HttpResponse)]
//! struct UpdateUserResponse {
//!     #[http("body")]
//!     user: User,
//! }
//! ```
//!
//! # Macro Expansion
//!
//! The derives do not interpret descriptors. They forward the raw string
//! together with a typed setter for the field, and the descriptor grammar is
//! checked once when the codec is compiled at registration. A field without
//! an attribute is reported then as `missing 'http' tag for field '<name>'`.
//!
//! Parameter fields must implement `FieldType` (scalars, `Option<_>` and
//! `Vec<_>` of them); a `body` field must implement `DeserializeOwned`.

mod expand;
mod parse;

use proc_macro::TokenStream;

/// Derives `HttpRequest` for a struct with named fields.
///
/// The struct must also implement `Default`; decoding starts from the default
/// value and sets each field from its source.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Debug, Default, HttpRequest)]
/// struct ListUsers {
///     #[http("query")]
///     limit: Option<u32>,
///     #[http("query,tag")]
///     tags: Vec<String>,
/// }
/// ```
#[proc_macro_derive(HttpRequest, attributes(http))]
pub fn derive_http_request(input: TokenStream) -> TokenStream {
    expand::expand_http_request(input.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derives `HttpResponse` for a struct with named fields.
///
/// The whole value is serialized as the JSON body, so the struct must also
/// implement `Serialize`.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Debug, Serialize, HttpResponse)]
/// struct GetUserResponse {
///     #[http("body")]
///     user: User,
/// }
/// ```
#[proc_macro_derive(HttpResponse, attributes(http))]
pub fn derive_http_response(input: TokenStream) -> TokenStream {
    expand::expand_http_response(input.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
