//! Service registry.
//!
//! A [`Service`] maps method names to registered methods together with the
//! HTTP codecs compiled for their message types. Every mutation rebuilds the
//! whole [`Snapshot`], middleware chains included, and swaps it in atomically;
//! readers never take a lock and in-flight requests keep the snapshot they
//! loaded.

use crate::adapter::{IntoOutcome, Method, MethodAdapter, MethodFuture, Payload, TypeInfo};
use crate::context::RequestContext;
use crate::environment::Environment;
use crate::error::{InvocationError, RegistrationError};
use arc_swap::ArcSwap;
use bindery_codec::json::short_type_name;
use bindery_codec::{
    EncodeError, HttpError, HttpRequest, HttpResponse, JsonFormat, ParseRequestError,
    RequestCodec, RequestParts, ResponseCodec,
};
use bytes::Bytes;
use http::StatusCode;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Static description of a service, handed to middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    name: Arc<str>,
    environment: Environment,
}

impl ServiceInfo {
    /// Creates a service description.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, environment: Environment) -> Self {
        Self {
            name: name.into(),
            environment,
        }
    }

    /// Returns the service name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the runtime environment.
    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.environment
    }
}

/// Decorates a method.
///
/// Middleware is applied in registration order, so the first one added ends
/// up innermost, closest to the handler. Any
/// `Fn(&ServiceInfo, &str, Method) -> Method` is a middleware.
pub trait Middleware: Send + Sync + 'static {
    /// Wraps `next`, the method registered as `method`.
    fn wrap(&self, service: &ServiceInfo, method: &str, next: Method) -> Method;
}

impl<F> Middleware for F
where
    F: Fn(&ServiceInfo, &str, Method) -> Method + Send + Sync + 'static,
{
    fn wrap(&self, service: &ServiceInfo, method: &str, next: Method) -> Method {
        self(service, method, next)
    }
}

/// Type-erased HTTP codecs of one method.
pub trait HttpBinding: Send + Sync {
    /// Decodes the request message.
    fn decode(&self, parts: &RequestParts) -> Result<Box<dyn Payload>, ParseRequestError>;

    /// Encodes the response message, if any.
    fn encode(
        &self,
        response: Option<&dyn Payload>,
        accept: Option<&str>,
        format: JsonFormat,
    ) -> Result<Option<Bytes>, EncodeError>;
}

/// The request decoder and response encoder compiled for a method.
pub struct MessageCodecs<Req, Res> {
    request: RequestCodec<Req>,
    response: ResponseCodec<Res>,
}

impl<Req: HttpRequest, Res: HttpResponse> MessageCodecs<Req, Res> {
    /// Compiles both codecs.
    pub fn compile() -> Result<Self, RegistrationError> {
        let request = RequestCodec::<Req>::compile().map_err(|source| {
            RegistrationError::RequestCodec {
                type_name: short_type_name(std::any::type_name::<Req>()),
                source,
            }
        })?;
        let response = ResponseCodec::<Res>::compile().map_err(|source| {
            RegistrationError::ResponseCodec {
                type_name: short_type_name(std::any::type_name::<Res>()),
                source,
            }
        })?;
        Ok(Self { request, response })
    }
}

impl<Req, Res> HttpBinding for MessageCodecs<Req, Res>
where
    Req: HttpRequest + fmt::Debug,
    Res: HttpResponse + fmt::Debug,
{
    fn decode(&self, parts: &RequestParts) -> Result<Box<dyn Payload>, ParseRequestError> {
        Ok(Box::new(self.request.decode(parts)?))
    }

    fn encode(
        &self,
        response: Option<&dyn Payload>,
        accept: Option<&str>,
        format: JsonFormat,
    ) -> Result<Option<Bytes>, EncodeError> {
        let response = match response {
            Some(payload) => Some(payload.as_any().downcast_ref::<Res>().ok_or_else(|| {
                HttpError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    InvocationError::ResponseType {
                        expected: std::any::type_name::<Res>(),
                        found: payload.type_name(),
                    },
                )
            })?),
            None => None,
        };
        self.response.encode(response, accept, format)
    }
}

impl<Req, Res> fmt::Debug for MessageCodecs<Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageCodecs")
            .field("request", &self.request)
            .field("response", &self.response)
            .finish()
    }
}

/// A registered method as served: the decorated chain plus its codecs.
#[derive(Clone)]
pub struct MethodEntry {
    name: Arc<str>,
    method: Method,
    binding: Arc<dyn HttpBinding>,
    request_type: TypeInfo,
    response_type: TypeInfo,
}

impl MethodEntry {
    /// Creates an entry from its parts.
    #[must_use]
    pub fn new(
        name: impl Into<Arc<str>>,
        method: Method,
        binding: Arc<dyn HttpBinding>,
        request_type: TypeInfo,
        response_type: TypeInfo,
    ) -> Self {
        Self {
            name: name.into(),
            method,
            binding,
            request_type,
            response_type,
        }
    }

    /// Returns the method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the decorated method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the HTTP codecs.
    #[must_use]
    pub fn binding(&self) -> &dyn HttpBinding {
        self.binding.as_ref()
    }

    /// Returns the request message type.
    #[must_use]
    pub const fn request_type(&self) -> TypeInfo {
        self.request_type
    }

    /// Returns the response message type.
    #[must_use]
    pub const fn response_type(&self) -> TypeInfo {
        self.response_type
    }

    /// Invokes the decorated method.
    pub fn invoke(&self, ctx: RequestContext, request: Box<dyn Payload>) -> MethodFuture {
        (self.method)(ctx, request)
    }
}

impl fmt::Debug for MethodEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodEntry")
            .field("name", &self.name)
            .field("request_type", &self.request_type.name())
            .field("response_type", &self.response_type.name())
            .finish_non_exhaustive()
    }
}

/// An immutable view of the registered methods.
#[derive(Debug, Default)]
pub struct Snapshot {
    entries: BTreeMap<String, Arc<MethodEntry>>,
}

impl Snapshot {
    /// Returns the entry of a method.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<MethodEntry>> {
        self.entries.get(name)
    }

    /// Returns the method names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns the number of methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no method is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct Registered {
    method: Method,
    binding: Arc<dyn HttpBinding>,
    request_type: TypeInfo,
    response_type: TypeInfo,
}

#[derive(Default)]
struct Registry {
    methods: BTreeMap<String, Registered>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Registry {
    fn build(&self, info: &ServiceInfo) -> Snapshot {
        let entries = self
            .methods
            .iter()
            .map(|(name, registered)| {
                let chain = self
                    .middleware
                    .iter()
                    .fold(Arc::clone(&registered.method), |next, middleware| {
                        middleware.wrap(info, name, next)
                    });
                let entry = MethodEntry::new(
                    name.as_str(),
                    chain,
                    Arc::clone(&registered.binding),
                    registered.request_type,
                    registered.response_type,
                );
                (name.clone(), Arc::new(entry))
            })
            .collect();
        Snapshot { entries }
    }
}

/// A named collection of service methods.
///
/// # Example
///
/// ```rust
/// use bindery_codec::{BoxError, FieldDef, FieldTag, HttpRequest, HttpResponse};
/// use bindery_core::{Environment, RequestContext, Service};
/// use serde::Serialize;
///
/// #[derive(Debug, Default)]
/// struct Ping {}
///
/// impl HttpRequest for Ping {
///     fn fields() -> Vec<FieldDef<Self>> {
///         Vec::new()
///     }
/// }
///
/// #[derive(Debug, Serialize)]
/// struct Pong {}
///
/// impl HttpResponse for Pong {
///     fn fields() -> Vec<FieldTag> {
///         Vec::new()
///     }
/// }
///
/// async fn ping(_ctx: RequestContext, _req: Ping) -> Result<Pong, BoxError> {
///     Ok(Pong {})
/// }
///
/// let service = Service::new("echo", Environment::Development);
/// service.add_method("Ping", ping).unwrap();
/// assert_eq!(service.method_names(), vec!["Ping".to_string()]);
/// ```
pub struct Service {
    info: ServiceInfo,
    registry: Mutex<Registry>,
    snapshot: ArcSwap<Snapshot>,
}

impl Service {
    /// Creates an empty service.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, environment: Environment) -> Self {
        Self {
            info: ServiceInfo::new(name, environment),
            registry: Mutex::new(Registry::default()),
            snapshot: ArcSwap::from_pointee(Snapshot::default()),
        }
    }

    /// Returns the service description.
    #[must_use]
    pub const fn info(&self) -> &ServiceInfo {
        &self.info
    }

    /// Returns the service name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.info.name()
    }

    /// Returns the runtime environment.
    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.info.environment()
    }

    /// Registers a handler function under `name`.
    ///
    /// Both message codecs are compiled here. A method already registered
    /// under the same name is replaced.
    pub fn add_method<Req, Res, F, Fut, O>(
        &self,
        name: impl Into<String>,
        handler: F,
    ) -> Result<(), RegistrationError>
    where
        Req: HttpRequest + fmt::Debug,
        Res: HttpResponse + fmt::Debug,
        F: Fn(RequestContext, Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
        O: IntoOutcome<Response = Res> + 'static,
    {
        self.add_adapter(name, MethodAdapter::new(handler))
    }

    /// Registers an already built adapter under `name`.
    pub fn add_adapter<Req, Res>(
        &self,
        name: impl Into<String>,
        adapter: MethodAdapter<Req, Res>,
    ) -> Result<(), RegistrationError>
    where
        Req: HttpRequest + fmt::Debug,
        Res: HttpResponse + fmt::Debug,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(RegistrationError::EmptyName);
        }

        let codecs = MessageCodecs::<Req, Res>::compile()?;
        let registered = Registered {
            method: adapter.erase(),
            binding: Arc::new(codecs),
            request_type: adapter.request_type(),
            response_type: adapter.response_type(),
        };

        tracing::debug!(
            service = %self.info.name(),
            method = %name,
            request = %registered.request_type.short_name(),
            response = %registered.response_type.short_name(),
            "Registered method"
        );

        self.update(|registry| {
            registry.methods.insert(name, registered);
        });
        Ok(())
    }

    /// Removes a method. Returns `false` if it was not registered.
    pub fn remove_method(&self, name: &str) -> bool {
        let removed = self.update(|registry| registry.methods.remove(name).is_some());
        if removed {
            tracing::debug!(service = %self.info.name(), method = %name, "Removed method");
        }
        removed
    }

    /// Appends a middleware and rebuilds every method chain.
    pub fn add_middleware(&self, middleware: impl Middleware) {
        self.update(|registry| registry.middleware.push(Arc::new(middleware)));
    }

    /// Returns the decorated method registered as `name`.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<Method> {
        self.snapshot
            .load()
            .get(name)
            .map(|entry| Arc::clone(entry.method()))
    }

    /// Returns the full entry of the method registered as `name`.
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<Arc<MethodEntry>> {
        self.snapshot.load().get(name).cloned()
    }

    /// Returns the registered method names in sorted order.
    #[must_use]
    pub fn method_names(&self) -> Vec<String> {
        self.snapshot.load().names().map(str::to_string).collect()
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }

    fn update<R>(&self, f: impl FnOnce(&mut Registry) -> R) -> R {
        let mut registry = self.registry.lock();
        let result = f(&mut registry);
        self.snapshot.store(Arc::new(registry.build(&self.info)));
        result
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("info", &self.info)
            .field("methods", &self.method_names())
            .finish_non_exhaustive()
    }
}
