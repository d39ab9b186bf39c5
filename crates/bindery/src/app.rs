//! Service bootstrap.
//!
//! [`App`] ties configuration, logging, metrics and the HTTP server together
//! for one service process:
//!
//! ```rust,ignore
//! use bindery::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), AppError> {
//!     let app = App::load("users")?
//!         .route(Method::GET, "/users/{id}", "GetUser")
//!         .add_daemon("cache-refresh", refresh_cache());
//!     app.add_method("GetUser", get_user)?;
//!     app.run().await
//! }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bindery_codec::{BoxError, HttpRequest, HttpResponse};
use bindery_config::{BinderyConfig, ConfigError, ConfigLoader, ServiceConfig};
use bindery_core::{Cancellation, IntoOutcome, RegistrationError, RequestContext, Service};
use bindery_server::{
    shutdown, Daemons, Router, Server, ServerConfig, ServerConfigBuilder, ServerError,
};
use bindery_telemetry::{init_logging, middleware, prometheus_exporter, TelemetryError};
use http::Method;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors that stop a service process.
#[derive(Debug, Error)]
pub enum AppError {
    /// The configuration could not be loaded.
    #[error("failed loading configuration")]
    Config(#[from] ConfigError),

    /// A method could not be registered.
    #[error("failed registering method")]
    Registration(#[from] RegistrationError),

    /// Logging or metrics could not be set up.
    #[error("failed setting up telemetry")]
    Telemetry(#[from] TelemetryError),

    /// The server or a daemon failed.
    #[error("service stopped with an error")]
    Server(#[from] ServerError),
}

/// A configured service process.
pub struct App {
    config: BinderyConfig,
    service: Arc<Service>,
    router: Router,
    version: Option<String>,
    daemons: Daemons,
}

impl App {
    /// Creates an app from a loaded configuration.
    #[must_use]
    pub fn new(config: BinderyConfig) -> Self {
        let service = Arc::new(Service::new(
            config.service.name.as_str(),
            config.service.environment,
        ));

        Self {
            config,
            service,
            router: Router::new(),
            version: None,
            daemons: Daemons::new(),
        }
    }

    /// Loads the configuration of the service `name` and creates an app.
    ///
    /// Reads the first of `./<name>.toml`, `./<name>.json`,
    /// `/etc/<name>/<name>.toml` and `/etc/<name>/<name>.json`, then `.env`,
    /// then the `NAME__SECTION__KEY`, `NAME_ENV` and `NAME_LOGLEVEL`
    /// variables, where `NAME` is `name` upper-cased with `-` as `_`.
    /// The service is called `name` unless a source sets `service.name`.
    pub fn load(name: &str) -> Result<Self, AppError> {
        let loader = ConfigLoader::new()
            .with_service_files(name)?
            .with_dotenv()?
            .with_env_prefix(&env_prefix(name));
        Self::from_loader(loader, name)
    }

    fn from_loader(loader: ConfigLoader, name: &str) -> Result<Self, AppError> {
        let mut config = loader.load()?;
        if config.service.name == ServiceConfig::default().name {
            config.service.name = name.to_string();
        }
        Ok(Self::new(config))
    }

    /// Deserializes the `[app]` configuration section into `C`.
    ///
    /// ```rust,ignore
    /// #[derive(Deserialize)]
    /// struct Settings {
    ///     upstream: String,
    /// }
    ///
    /// let app = App::load("users")?;
    /// let settings: Settings = app.settings()?;
    /// ```
    pub fn settings<C: DeserializeOwned>(&self) -> Result<C, AppError> {
        Ok(self.config.app_settings()?)
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &BinderyConfig {
        &self.config
    }

    /// Returns the service registry.
    #[must_use]
    pub fn service(&self) -> &Arc<Service> {
        &self.service
    }

    /// Returns the router.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Registers a handler under `name`.
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
        self.service.add_method(name, handler)
    }

    /// Routes `method` requests matching `pattern` to the method `name`.
    #[must_use]
    pub fn route(mut self, method: Method, pattern: &str, name: &str) -> Self {
        self.router.add_route(method, pattern, name);
        self
    }

    /// Sets the version reported by `/health`.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Runs `daemon` next to the server.
    ///
    /// A daemon that fails shuts the service down; one that finishes
    /// cleanly leaves the server running.
    #[must_use]
    pub fn add_daemon<F, E>(mut self, name: impl Into<String>, daemon: F) -> Self
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError>,
    {
        self.daemons = self.daemons.add(name, daemon);
        self
    }

    /// Builds the HTTP server for the current routes.
    #[must_use]
    pub fn server(&self) -> Server {
        let mut builder = server_config_builder(&self.config);
        if let Some(version) = &self.version {
            builder = builder.version(version.as_str());
        }
        Server::new(builder.build(), Arc::clone(&self.service), self.router.clone())
    }

    /// Runs the service until SIGTERM or SIGINT.
    ///
    /// Initializes logging, installs the method logging and duration
    /// middlewares, then serves HTTP next to the metrics exporter and the
    /// added daemons. The service stops when a signal arrives, the server
    /// fails, or a daemon fails.
    pub async fn run(mut self) -> Result<(), AppError> {
        init_logging(&self.config.log_config())?;

        self.service.add_middleware(middleware::logging());
        self.service.add_middleware(middleware::method_duration());

        if let Some(exporter) = prometheus_exporter(&self.config.metrics_config())? {
            self.daemons = std::mem::take(&mut self.daemons).add("metrics", exporter);
        }

        let shutdown = Cancellation::new();
        shutdown::trigger_on_os_signal(shutdown.clone());

        tracing::info!(
            service = %self.service.name(),
            environment = ?self.service.environment(),
            methods = self.service.method_names().len(),
            daemons = self.daemons.len(),
            "Starting service"
        );

        self.serve_until(shutdown).await
    }

    async fn serve_until(mut self, shutdown: Cancellation) -> Result<(), AppError> {
        let daemons = std::mem::take(&mut self.daemons);
        let server = self.server();

        let served = async {
            let result = server.run_with_shutdown(shutdown.clone()).await;
            shutdown.trigger();
            result
        };
        let ran = async {
            let result = daemons.run_until(shutdown.cancelled()).await;
            if result.is_err() {
                shutdown.trigger();
            }
            result
        };

        let (served, ran) = tokio::join!(served, ran);
        served?;
        ran?;

        tracing::info!(service = %self.service.name(), "Service stopped");
        Ok(())
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("service", &self.service.name())
            .field("router", &self.router)
            .field("daemons", &self.daemons)
            .finish_non_exhaustive()
    }
}

/// Converts the `server` section of a configuration to a [`ServerConfig`].
#[must_use]
pub fn server_config(config: &BinderyConfig) -> ServerConfig {
    server_config_builder(config).build()
}

fn server_config_builder(config: &BinderyConfig) -> ServerConfigBuilder {
    ServerConfig::builder()
        .http_addr(config.server.http_addr.as_str())
        .shutdown_timeout(Duration::from_secs(config.server.shutdown_timeout_secs))
        .request_timeout(Duration::from_millis(config.server.request_timeout_ms))
        .server_header(config.server.server_header.as_str())
        .max_body_size(config.server.max_body_bytes)
}

/// `user-api` reads `USER_API__SERVER__HTTP_ADDR` and friends.
fn env_prefix(name: &str) -> String {
    name.to_uppercase().replace(['-', '.'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_core::Environment;

    #[test]
    fn test_server_config_from_configuration() {
        let mut config = BinderyConfig::default();
        config.server.http_addr = "127.0.0.1:3000".to_string();
        config.server.shutdown_timeout_secs = 5;
        config.server.request_timeout_ms = 1500;
        config.server.server_header = "users".to_string();
        config.server.max_body_bytes = 512;

        let server = server_config(&config);
        assert_eq!(server.http_addr(), "127.0.0.1:3000");
        assert_eq!(server.shutdown_timeout(), Duration::from_secs(5));
        assert_eq!(server.request_timeout(), Duration::from_millis(1500));
        assert_eq!(server.server_header(), "users");
        assert_eq!(server.max_body_size(), 512);
    }

    #[test]
    fn test_app_uses_service_section() {
        let mut config = BinderyConfig::production();
        config.service.name = "users".to_string();

        let app = App::new(config).route(Method::GET, "/users/{id}", "GetUser");
        assert_eq!(app.service().name(), "users");
        assert_eq!(app.service().environment(), Environment::Production);
        assert_eq!(app.router().route_count(), 1);
    }

    #[test]
    fn test_with_version_reaches_health() {
        let app = App::new(BinderyConfig::default()).with_version("2.0.0");
        let server = app.server();
        assert_eq!(server.health().version(), "2.0.0");
        assert_eq!(server.config().server_header(), "bindery");
    }

    #[test]
    fn test_env_prefix_from_service_name() {
        assert_eq!(env_prefix("users"), "USERS");
        assert_eq!(env_prefix("user-api"), "USER_API");
        assert_eq!(env_prefix("billing.v2"), "BILLING_V2");
    }

    #[test]
    fn test_load_names_service_after_files() {
        let app = App::load("bindery-app-test-without-files").unwrap();
        assert_eq!(app.service().name(), "bindery-app-test-without-files");
        assert_eq!(app.config().server.http_addr, "0.0.0.0:8080");
    }

    #[derive(Debug, serde::Deserialize)]
    struct Settings {
        upstream: String,
        retries: u32,
    }

    #[test]
    fn test_loaded_file_and_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.toml");
        std::fs::write(
            &path,
            r#"
            [server]
            http_addr = "127.0.0.1:4000"

            [app]
            upstream = "http://accounts:8080"
            retries = 3
            "#,
        )
        .unwrap();

        let loader = ConfigLoader::new().with_file(&path).unwrap();
        let app = App::from_loader(loader, "users").unwrap();
        assert_eq!(app.service().name(), "users");
        assert_eq!(app.config().server.http_addr, "127.0.0.1:4000");

        let settings: Settings = app.settings().unwrap();
        assert_eq!(settings.upstream, "http://accounts:8080");
        assert_eq!(settings.retries, 3);

        let mismatched = app.settings::<std::collections::HashMap<String, bool>>();
        assert!(matches!(mismatched, Err(AppError::Config(ConfigError::AppSection(_)))));
    }

    #[test]
    fn test_configured_service_name_wins() {
        let loader = ConfigLoader::new()
            .with_string("[service]\nname = \"accounts\"", "toml")
            .unwrap();
        let app = App::from_loader(loader, "users").unwrap();
        assert_eq!(app.service().name(), "accounts");
    }

    fn listening_on(addr: &str) -> App {
        let mut config = BinderyConfig::default();
        config.server.http_addr = addr.to_string();
        config.server.shutdown_timeout_secs = 1;
        App::new(config)
    }

    #[tokio::test]
    async fn test_bind_failure_stops_daemons() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap().to_string();

        let app = listening_on(&addr)
            .add_daemon("idle", std::future::pending::<Result<(), std::io::Error>>());
        let result = tokio::time::timeout(Duration::from_secs(5), app.serve_until(Cancellation::new()))
            .await
            .expect("a bind failure should end the service");

        assert!(matches!(result, Err(AppError::Server(ServerError::Bind { .. }))));
    }

    #[tokio::test]
    async fn test_failing_daemon_stops_server() {
        let app = listening_on("127.0.0.1:0").add_daemon("cache-refresh", async {
            Err::<(), _>(std::io::Error::other("upstream gone"))
        });
        let result = tokio::time::timeout(Duration::from_secs(5), app.serve_until(Cancellation::new()))
            .await
            .expect("a failing daemon should end the service");

        assert!(matches!(
            result,
            Err(AppError::Server(ServerError::Daemon { ref name, .. })) if name == "cache-refresh"
        ));
    }

    #[tokio::test]
    async fn test_finished_daemon_keeps_server_running() {
        let app = listening_on("127.0.0.1:0")
            .add_daemon("warmup", async { Ok::<(), std::io::Error>(()) });
        let shutdown = Cancellation::new();
        let handle = tokio::spawn(app.serve_until(shutdown.clone()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());

        shutdown.trigger();
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("shutdown should end the service")
            .unwrap();
        assert!(result.is_ok());
    }
}
