//! HTTP server implementation.
//!
//! The server is a hyper HTTP/1.1 accept loop in front of a [`Service`]:
//!
//! - `GET /health` answers with the built-in heartbeat
//! - every other request is routed by the [`Router`] to a method name and
//!   served by [`endpoint::dispatch`](crate::endpoint::dispatch)
//! - every response carries the `server` and `x-request-id` headers
//!
//! # Example
//!
//! ```rust,ignore
//! use bindery_server::{Router, Server, ServerConfig};
//! use http::Method;
//!
//! let router = Router::new().route(Method::GET, "/users/{id}", "GetUser");
//! let server = Server::new(ServerConfig::default(), service, router);
//! server.run().await?;
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use bindery_codec::RequestParts;
use bindery_core::{Cancellation, RequestContext, RequestId, Service};
use bytes::Bytes;
use http::header::{self, HeaderName, HeaderValue};
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};

use crate::config::{ServerConfig, DEFAULT_SERVER_HEADER};
use crate::endpoint::{self, ResponseBody};
use crate::error::ServerError;
use crate::health::HealthCheck;
use crate::router::Router;
use crate::shutdown::{self, ConnectionTracker};

/// Request and response header carrying the request id.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// The HTTP server of a service.
pub struct Server {
    config: ServerConfig,
    router: Router,
    service: Arc<Service>,
    health: HealthCheck,
    server_header: HeaderValue,
}

impl Server {
    /// Creates a server for `service`.
    #[must_use]
    pub fn new(config: ServerConfig, service: Arc<Service>, router: Router) -> Self {
        let server_header = HeaderValue::from_str(config.server_header())
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_SERVER_HEADER));
        let health = HealthCheck::new(service.name(), config.version());

        Self {
            config,
            router,
            service,
            health,
            server_header,
        }
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the router.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Returns a mutable reference to the router.
    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    /// Returns the served service.
    #[must_use]
    pub fn service(&self) -> &Arc<Service> {
        &self.service
    }

    /// Returns the health check.
    #[must_use]
    pub fn health(&self) -> &HealthCheck {
        &self.health
    }

    /// Runs the server until SIGTERM or SIGINT.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = Cancellation::new();
        shutdown::trigger_on_os_signal(shutdown.clone());
        self.run_with_shutdown(shutdown).await
    }

    /// Binds the configured address and serves until `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub async fn run_with_shutdown(self, shutdown: Cancellation) -> Result<(), ServerError> {
        let addr = self
            .config
            .socket_addr()
            .map_err(|source| ServerError::InvalidAddress {
                addr: self.config.http_addr().to_string(),
                source,
            })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        self.serve(listener, shutdown).await;
        Ok(())
    }

    /// Serves connections from `listener` until `shutdown` fires.
    ///
    /// Shutdown stops accepting, asks open connections to finish their
    /// current request and waits up to the shutdown timeout for them.
    /// Request contexts share `shutdown` as their cancellation.
    pub async fn serve(self, listener: TcpListener, shutdown: Cancellation) {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(service = %self.service.name(), %addr, "Server listening");
        }

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                result = listener.accept() => match result {
                    Ok((stream, remote_addr)) => {
                        let server = Arc::clone(&server);
                        let token = tracker.acquire();
                        let shutdown = shutdown.clone();

                        tokio::spawn(async move {
                            server.serve_connection(stream, remote_addr, shutdown).await;
                            drop(token);
                        });
                    }
                    Err(e) => tracing::error!(error = %e, "Failed to accept connection"),
                },
                () = shutdown.cancelled() => {
                    tracing::info!("Shutdown signal received, stopping server");
                    break;
                }
            }
        }
        drop(listener);

        let shutdown_timeout = server.config.shutdown_timeout();
        tracing::info!(
            timeout = ?shutdown_timeout,
            connections = tracker.active_connections(),
            "Waiting for connections to close"
        );

        if tokio::time::timeout(shutdown_timeout, tracker.wait_for_idle())
            .await
            .is_err()
        {
            tracing::warn!(
                connections = tracker.active_connections(),
                "Shutdown timeout reached with connections still open"
            );
        }

        tracing::info!("Server stopped");
    }

    async fn serve_connection(
        self: Arc<Self>,
        stream: TcpStream,
        remote_addr: SocketAddr,
        shutdown: Cancellation,
    ) {
        let io = TokioIo::new(stream);
        let server = Arc::clone(&self);
        let request_shutdown = shutdown.clone();

        let service = service_fn(move |req: Request<Incoming>| {
            let server = Arc::clone(&server);
            let shutdown = request_shutdown.clone();
            async move { Ok::<_, Infallible>(server.handle_request(req, &shutdown).await) }
        });

        let conn = http1::Builder::new().serve_connection(io, service);
        tokio::pin!(conn);

        let mut draining = false;
        let result = loop {
            tokio::select! {
                result = conn.as_mut() => break result,
                () = shutdown.cancelled(), if !draining => {
                    draining = true;
                    conn.as_mut().graceful_shutdown();
                }
            }
        };

        if let Err(e) = result {
            tracing::debug!(%remote_addr, error = %e, "Connection closed with error");
        }
    }

    async fn handle_request(
        &self,
        req: Request<Incoming>,
        shutdown: &Cancellation,
    ) -> Response<ResponseBody> {
        let started = Instant::now();
        let http_method = req.method().clone();
        let path = req.uri().path().to_string();

        let request_id = req
            .headers()
            .get(&X_REQUEST_ID)
            .and_then(|value| value.to_str().ok())
            .and_then(RequestId::parse)
            .unwrap_or_default();

        let mut response = self
            .route_request(req, request_id, &http_method, &path, shutdown)
            .await;

        let headers = response.headers_mut();
        headers.insert(header::SERVER, self.server_header.clone());
        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
            headers.insert(X_REQUEST_ID, value);
        }

        tracing::debug!(
            service = %self.service.name(),
            request_id = %request_id,
            http_method = %http_method,
            path = %path,
            status = response.status().as_u16(),
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Request served"
        );

        response
    }

    async fn route_request(
        &self,
        req: Request<Incoming>,
        request_id: RequestId,
        http_method: &Method,
        path: &str,
        shutdown: &Cancellation,
    ) -> Response<ResponseBody> {
        if path == "/health" && (http_method == Method::GET || http_method == Method::HEAD) {
            return self.handle_health(shutdown);
        }

        let Some(route) = self.router.match_route(http_method, path) else {
            return empty_response(StatusCode::NOT_FOUND);
        };
        let (method_name, params) = route.into_parts();

        // In-flight requests keep the snapshot they started with.
        let snapshot = self.service.snapshot();
        let Some(entry) = snapshot.get(&method_name) else {
            tracing::warn!(method = %method_name, "No method registered for route");
            return empty_response(StatusCode::NOT_IMPLEMENTED);
        };

        let (parts, body) = req.into_parts();
        let body = Limited::new(body, self.config.max_body_size());
        let body = match tokio::time::timeout(self.config.request_timeout(), body.collect()).await
        {
            Ok(Ok(collected)) => collected.to_bytes(),
            Ok(Err(e)) if e.is::<LengthLimitError>() => {
                tracing::warn!(
                    request_id = %request_id,
                    limit = self.config.max_body_size(),
                    "Request body too large"
                );
                return empty_response(StatusCode::PAYLOAD_TOO_LARGE);
            }
            Ok(Err(e)) => {
                tracing::warn!(request_id = %request_id, error = %e, "Failed to read request body");
                return empty_response(StatusCode::BAD_REQUEST);
            }
            Err(_) => {
                tracing::warn!(request_id = %request_id, "Request body collection timed out");
                return empty_response(StatusCode::REQUEST_TIMEOUT);
            }
        };

        let parts = RequestParts::from_http(parts, body, params);
        let ctx = RequestContext::with_request_id(request_id)
            .with_method(method_name.as_str())
            .with_timeout(self.config.request_timeout())
            .with_cancellation(shutdown.clone());

        endpoint::dispatch(entry, ctx, &parts, self.service.environment().json_format()).await
    }

    fn handle_health(&self, shutdown: &Cancellation) -> Response<ResponseBody> {
        let report = self
            .health
            .report(self.service.snapshot().len(), shutdown.is_cancelled());
        let Ok(body) = serde_json::to_vec(&report) else {
            return empty_response(report.state.status_code());
        };

        let mut response = Response::new(Full::new(Bytes::from(body)));
        *response.status_mut() = report.state.status_code();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("router", &self.router)
            .field("service", &self.service.name())
            .finish_non_exhaustive()
    }
}

fn empty_response(status: StatusCode) -> Response<ResponseBody> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}
