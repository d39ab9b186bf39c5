//! # Bindery Server
//!
//! HTTP server for Bindery services.
//!
//! - HTTP/1.1 via Hyper
//! - Routing of `(method, "/path/{param}")` to registered service methods
//! - The per-method endpoint: decode, invoke, encode, with panics caught
//! - Built-in `GET /health` heartbeat
//! - `server` and `x-request-id` headers on every response
//! - Graceful shutdown on SIGTERM/SIGINT
//! - [`Daemons`] for running the server next to other long-lived tasks
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use bindery_core::{Environment, Service};
//! use bindery_server::{Router, Server, ServerConfig};
//! use http::Method;
//!
//! let service = Arc::new(Service::new("users", Environment::Production));
//! service.add_method("GetUser", get_user)?;
//!
//! let router = Router::new().route(Method::GET, "/users/{id}", "GetUser");
//! Server::new(ServerConfig::default(), service, router).run().await?;
//! ```

#![doc(html_root_url = "https://docs.rs/bindery-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod endpoint;
mod error;
mod health;
mod lifecycle;
mod router;
mod server;
pub mod shutdown;

pub use config::{
    ServerConfig, ServerConfigBuilder, DEFAULT_HTTP_ADDR, DEFAULT_MAX_BODY_SIZE,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SERVER_HEADER, DEFAULT_SHUTDOWN_TIMEOUT_SECS,
};
pub use endpoint::{dispatch, ResponseBody};
pub use error::ServerError;
pub use health::{HealthCheck, HealthStatus, Liveness};
pub use lifecycle::Daemons;
pub use router::{RouteMatch, Router};
pub use server::{Server, X_REQUEST_ID};
