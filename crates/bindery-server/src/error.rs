//! Server error types.

use bindery_codec::BoxError;
use thiserror::Error;

/// Errors from running the server or its daemons.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The configured address is not a socket address.
    #[error("invalid address '{addr}': {source}")]
    InvalidAddress {
        /// The configured address.
        addr: String,
        /// Parse failure.
        #[source]
        source: std::net::AddrParseError,
    },

    /// The listener could not be bound.
    #[error("failed to bind to {addr}")]
    Bind {
        /// The address.
        addr: std::net::SocketAddr,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Waiting for OS signals failed.
    #[error("failed to listen for shutdown signals")]
    Signal(#[source] std::io::Error),

    /// A daemon returned an error.
    #[error("daemon '{name}' failed")]
    Daemon {
        /// Daemon name.
        name: String,
        /// Its error.
        #[source]
        source: BoxError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_address_display() {
        let source = "nope".parse::<std::net::SocketAddr>().unwrap_err();
        let err = ServerError::InvalidAddress {
            addr: "nope".to_string(),
            source,
        };
        assert!(err.to_string().starts_with("invalid address 'nope'"));
    }

    #[test]
    fn test_daemon_error_keeps_source() {
        let err = ServerError::Daemon {
            name: "metrics".to_string(),
            source: "port in use".into(),
        };
        assert_eq!(err.to_string(), "daemon 'metrics' failed");
        assert_eq!(
            std::error::Error::source(&err).map(ToString::to_string).as_deref(),
            Some("port in use")
        );
    }
}
