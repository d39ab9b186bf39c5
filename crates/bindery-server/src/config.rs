//! Server configuration types.
//!
//! # Example
//!
//! ```rust
//! use bindery_server::ServerConfig;
//! use std::time::Duration;
//!
//! let config = ServerConfig::builder()
//!     .http_addr("0.0.0.0:8080")
//!     .shutdown_timeout(Duration::from_secs(30))
//!     .build();
//!
//! assert_eq!(config.http_addr(), "0.0.0.0:8080");
//! ```

use std::net::SocketAddr;
use std::time::Duration;

/// Default HTTP bind address.
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default `Server` response header.
pub const DEFAULT_SERVER_HEADER: &str = "bindery";

/// Default request body limit in bytes (2 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

/// Server configuration.
///
/// Use [`ServerConfig::builder()`] to construct instances.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP server bind address (e.g., "0.0.0.0:8080")
    http_addr: String,

    /// How long to wait for open connections on shutdown
    shutdown_timeout: Duration,

    /// Body collection timeout and handler deadline
    request_timeout: Duration,

    /// Value of the `Server` header on every response
    server_header: String,

    /// Largest request body accepted, in bytes
    max_body_size: usize,

    /// Version reported by `/health`
    version: String,
}

impl ServerConfig {
    /// Creates a new server configuration builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }

    /// Returns the HTTP bind address.
    #[must_use]
    pub fn http_addr(&self) -> &str {
        &self.http_addr
    }

    /// Parses the HTTP bind address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is not a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.http_addr.parse()
    }

    /// Returns the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Returns the request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns the `Server` header value.
    #[must_use]
    pub fn server_header(&self) -> &str {
        &self.server_header
    }

    /// Returns the request body limit in bytes.
    #[must_use]
    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    /// Returns the version reported by `/health`.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfigBuilder::new().build()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone, Default)]
pub struct ServerConfigBuilder {
    http_addr: Option<String>,
    shutdown_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
    server_header: Option<String>,
    max_body_size: Option<usize>,
    version: Option<String>,
}

impl ServerConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP bind address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.http_addr = Some(addr.into());
        self
    }

    /// Sets how long shutdown waits for open connections.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = Some(timeout);
        self
    }

    /// Sets the request timeout.
    ///
    /// It bounds body collection and becomes the handler's deadline.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the `Server` response header.
    #[must_use]
    pub fn server_header(mut self, value: impl Into<String>) -> Self {
        self.server_header = Some(value.into());
        self
    }

    /// Sets the request body limit in bytes.
    ///
    /// Larger bodies are answered with 413.
    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = Some(size);
        self
    }

    /// Sets the version reported by `/health`.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            http_addr: self
                .http_addr
                .unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string()),
            shutdown_timeout: self
                .shutdown_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS)),
            request_timeout: self
                .request_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
            server_header: self
                .server_header
                .unwrap_or_else(|| DEFAULT_SERVER_HEADER.to_string()),
            max_body_size: self.max_body_size.unwrap_or(DEFAULT_MAX_BODY_SIZE),
            version: self
                .version
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.http_addr(), DEFAULT_HTTP_ADDR);
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.server_header(), "bindery");
        assert_eq!(config.max_body_size(), DEFAULT_MAX_BODY_SIZE);
        assert_eq!(config.version(), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_builder_chaining() {
        let config = ServerConfig::builder()
            .http_addr("127.0.0.1:3000")
            .shutdown_timeout(Duration::from_secs(5))
            .request_timeout(Duration::from_millis(250))
            .server_header("users")
            .max_body_size(1024)
            .version("2.0.0")
            .build();

        assert_eq!(config.http_addr(), "127.0.0.1:3000");
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(5));
        assert_eq!(config.request_timeout(), Duration::from_millis(250));
        assert_eq!(config.server_header(), "users");
        assert_eq!(config.max_body_size(), 1024);
        assert_eq!(config.version(), "2.0.0");
    }

    #[test]
    fn test_socket_addr_parsing() {
        let config = ServerConfig::builder().http_addr("127.0.0.1:8080").build();
        let addr = config.socket_addr().unwrap();
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_socket_addr_invalid() {
        let config = ServerConfig::builder().http_addr("localhost").build();
        assert!(config.socket_addr().is_err());
    }
}
