//! # Bindery Core
//!
//! Core types for Bindery services.
//!
//! - [`RequestContext`] - Per-request context with request id, deadline and cancellation
//! - [`MethodAdapter`] - Turns a typed handler function into a uniformly invokable method
//! - [`Service`] - Registry of methods and their compiled HTTP codecs
//! - [`Middleware`] - Decorators applied to every method chain
//! - [`Environment`] - Development or production mode

#![doc(html_root_url = "https://docs.rs/bindery-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod adapter;
mod context;
mod environment;
mod error;
mod service;

pub use adapter::{IntoOutcome, Method, MethodAdapter, MethodFuture, Outcome, Payload, TypeInfo};
pub use context::{Cancellation, RequestContext, RequestId};
pub use environment::Environment;
pub use error::{InvocationError, RegistrationError};
pub use service::{
    HttpBinding, MessageCodecs, MethodEntry, Middleware, Service, ServiceInfo, Snapshot,
};
