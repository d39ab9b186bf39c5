//! # Bindery
//!
//! **Typed HTTP method bindings for Rust services**
//!
//! Bindery lets a service author write plain async handlers that take a
//! [`RequestContext`](core::RequestContext) and a typed request struct, and
//! return a typed response struct or an error. The request struct names the
//! HTTP source of every field; Bindery compiles these bindings once when the
//! method is registered and does all decoding and encoding:
//!
//! - `query`, `path`, `header` and `cookie` parameters, with `Option<_>` and
//!   `Vec<_>` fields
//! - strict JSON bodies (unknown fields are rejected)
//! - `content-type`/`accept` negotiation (415/406)
//! - error to status mapping through [`HttpError`](codec::HttpError)
//! - panics caught per request and answered with 500
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bindery::prelude::*;
//!
//! #[derive(Debug, Default, HttpRequest)]
//! struct GetUser {
//!     #[http("path")]
//!     id: u64,
//!     #[http("query")]
//!     fields: Vec<String>,
//! }
//!
//! #[derive(Debug, Serialize, HttpResponse)]
//! struct GetUserResponse {
//!     #[http("body")]
//!     user: User,
//! }
//!
//! async fn get_user(ctx: RequestContext, req: GetUser) -> Result<GetUserResponse, BoxError> {
//!     let user = lookup(req.id).await
//!         .ok_or_else(|| HttpError::new(StatusCode::NOT_FOUND, "no such user"))?;
//!     Ok(GetUserResponse { user })
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), AppError> {
//!     let app = App::load("users")?.route(Method::GET, "/users/{id}", "GetUser");
//!     app.add_method("GetUser", get_user)?;
//!     app.run().await
//! }
//! ```
//!
//! The derives expand to paths under `::bindery_codec`, so crates using them
//! depend on `bindery-codec` directly.

#![doc(html_root_url = "https://docs.rs/bindery/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;

pub use app::{server_config, App, AppError};

// Re-export the member crates
pub use bindery_codec as codec;
pub use bindery_config as config;
pub use bindery_core as core;
pub use bindery_server as server;
pub use bindery_telemetry as telemetry;

// Re-export the derives
pub use bindery_macros::{HttpRequest, HttpResponse};

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use bindery::prelude::*;
/// ```
pub mod prelude {
    pub use crate::app::{App, AppError};

    pub use bindery_codec::{status_of, BoxError, HttpError, JsonFormat};
    pub use bindery_core::{
        Cancellation, Environment, Outcome, RequestContext, RequestId, Service,
    };
    pub use bindery_macros::{HttpRequest, HttpResponse};
    pub use bindery_server::{Router, Server, ServerConfig};

    pub use http::{Method, StatusCode};
    pub use serde::{Deserialize, Serialize};
}
