//! Method adapter.
//!
//! A service method is any async function taking a [`RequestContext`] and an
//! owned request message, returning something that converts into an
//! [`Outcome`]. [`MethodAdapter`] checks that shape through trait bounds when
//! the method is registered, and exposes one uniform invocation contract for
//! it, either typed ([`MethodAdapter::invoke`]) or type-erased
//! ([`MethodAdapter::erase`]).
//!
//! # Example
//!
//! ```rust
//! use bindery_codec::{BoxError, FieldDef, FieldTag, HttpRequest, HttpResponse};
//! use bindery_core::{MethodAdapter, RequestContext};
//! use serde::Serialize;
//!
//! #[derive(Debug, Default)]
//! struct Ping {}
//!
//! impl HttpRequest for Ping {
//!     fn fields() -> Vec<FieldDef<Self>> {
//!         Vec::new()
//!     }
//! }
//!
//! #[derive(Debug, Serialize)]
//! struct Pong {
//!     ok: bool,
//! }
//!
//! impl HttpResponse for Pong {
//!     fn fields() -> Vec<FieldTag> {
//!         vec![FieldTag::new("ok", Some("body"))]
//!     }
//! }
//!
//! async fn ping(_ctx: RequestContext, _req: Ping) -> Result<Pong, BoxError> {
//!     Ok(Pong { ok: true })
//! }
//!
//! # tokio_test::block_on(async {
//! let adapter = MethodAdapter::new(ping);
//! let outcome = adapter.invoke(RequestContext::new(), Ping {}).await;
//! assert!(outcome.response.is_some_and(|pong| pong.ok));
//! assert!(outcome.error.is_none());
//! # });
//! ```

use crate::context::RequestContext;
use crate::error::InvocationError;
use bindery_codec::json::short_type_name;
use bindery_codec::{BoxError, HttpRequest, HttpResponse};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::any::{Any, TypeId};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// The result of one method invocation.
///
/// Unlike a `Result`, an outcome can carry a response and an error at the
/// same time. The endpoint then answers with the error's status and still
/// writes the response body.
#[derive(Debug)]
pub struct Outcome<Res> {
    /// Response, if any
    pub response: Option<Res>,
    /// Error, if any
    pub error: Option<BoxError>,
}

impl<Res> Outcome<Res> {
    /// A successful outcome with a response.
    #[must_use]
    pub const fn ok(response: Res) -> Self {
        Self {
            response: Some(response),
            error: None,
        }
    }

    /// A successful outcome without a response.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            response: None,
            error: None,
        }
    }

    /// A failed outcome without a response.
    #[must_use]
    pub fn err(error: impl Into<BoxError>) -> Self {
        Self {
            response: None,
            error: Some(error.into()),
        }
    }

    /// A failed outcome that still carries a response.
    #[must_use]
    pub fn with_error(response: Res, error: impl Into<BoxError>) -> Self {
        Self {
            response: Some(response),
            error: Some(error.into()),
        }
    }

    /// Returns `true` if no error is set.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Maps the response, keeping the error.
    pub fn map<U>(self, f: impl FnOnce(Res) -> U) -> Outcome<U> {
        Outcome {
            response: self.response.map(f),
            error: self.error,
        }
    }
}

/// Conversion of a method's return value into an [`Outcome`].
pub trait IntoOutcome {
    /// Response message type
    type Response;

    /// Performs the conversion.
    fn into_outcome(self) -> Outcome<Self::Response>;
}

impl<Res, E> IntoOutcome for Result<Res, E>
where
    E: Into<BoxError>,
{
    type Response = Res;

    fn into_outcome(self) -> Outcome<Res> {
        match self {
            Ok(response) => Outcome::ok(response),
            Err(error) => Outcome::err(error),
        }
    }
}

impl<Res> IntoOutcome for Outcome<Res> {
    type Response = Res;

    fn into_outcome(self) -> Outcome<Res> {
        self
    }
}

/// A type-erased request or response message.
///
/// Implemented for every `'static` type that is `Send` and `Debug`.
pub trait Payload: Any + Send + fmt::Debug {
    /// Returns the full type name of the value.
    fn type_name(&self) -> &'static str;

    /// Borrows the value as `Any`.
    fn as_any(&self) -> &dyn Any;

    /// Converts the boxed value into `Box<dyn Any>`.
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<T: Any + Send + fmt::Debug> Payload for T {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// Future returned by a type-erased method.
pub type MethodFuture = BoxFuture<'static, Outcome<Box<dyn Payload>>>;

/// A type-erased method, as seen by middleware and the endpoint.
pub type Method = Arc<dyn Fn(RequestContext, Box<dyn Payload>) -> MethodFuture + Send + Sync>;

/// Identity of a message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
}

impl TypeInfo {
    /// Returns the identity of `T`.
    #[must_use]
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Returns the type id.
    #[must_use]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    /// Returns the full type name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the type name without module paths.
    #[must_use]
    pub fn short_name(&self) -> String {
        short_type_name(self.name)
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

type TypedHandler<Req, Res> =
    dyn Fn(RequestContext, Req) -> BoxFuture<'static, Outcome<Res>> + Send + Sync;

/// A validated service method with request type `Req` and response type `Res`.
pub struct MethodAdapter<Req, Res> {
    handler: Arc<TypedHandler<Req, Res>>,
}

impl<Req, Res> MethodAdapter<Req, Res>
where
    Req: HttpRequest + fmt::Debug,
    Res: HttpResponse + fmt::Debug,
{
    /// Wraps a handler function.
    ///
    /// A function of any other shape does not satisfy the bounds and fails
    /// to compile.
    pub fn new<F, Fut, O>(handler: F) -> Self
    where
        F: Fn(RequestContext, Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
        O: IntoOutcome<Response = Res> + 'static,
    {
        let handler = move |ctx: RequestContext, request: Req| {
            handler(ctx, request).map(IntoOutcome::into_outcome).boxed()
        };
        Self {
            handler: Arc::new(handler),
        }
    }

    /// Returns the request message type.
    #[must_use]
    pub fn request_type(&self) -> TypeInfo {
        TypeInfo::of::<Req>()
    }

    /// Returns the response message type.
    #[must_use]
    pub fn response_type(&self) -> TypeInfo {
        TypeInfo::of::<Res>()
    }

    /// Invokes the handler.
    pub async fn invoke(&self, ctx: RequestContext, request: Req) -> Outcome<Res> {
        (self.handler)(ctx, request).await
    }

    /// Returns the type-erased form of this method.
    ///
    /// A request payload of any type other than `Req` yields an outcome
    /// holding [`InvocationError::RequestType`]; the handler is not called.
    #[must_use]
    pub fn erase(&self) -> Method {
        let handler = Arc::clone(&self.handler);
        Arc::new(move |ctx: RequestContext, payload: Box<dyn Payload>| {
            let found = (*payload).type_name();
            match payload.into_any().downcast::<Req>() {
                Ok(request) => handler(ctx, *request)
                    .map(|outcome| outcome.map(|response| Box::new(response) as Box<dyn Payload>))
                    .boxed(),
                Err(_) => {
                    let error = InvocationError::RequestType {
                        expected: std::any::type_name::<Req>(),
                        found,
                    };
                    futures_util::future::ready(Outcome::err(error)).boxed()
                }
            }
        })
    }
}

impl<Req, Res> Clone for MethodAdapter<Req, Res> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<Req, Res> fmt::Debug for MethodAdapter<Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodAdapter")
            .field("request", &std::any::type_name::<Req>())
            .field("response", &std::any::type_name::<Res>())
            .finish()
    }
}
