//! Telemetry errors.

use std::net::AddrParseError;

use metrics_exporter_prometheus::BuildError;
use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::util::TryInitError;

/// Failures while setting up or running logging and metrics.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The configured level is not an `EnvFilter` directive.
    #[error("log level `{directive}` is not a valid filter")]
    LogFilter {
        /// The directive that was tried.
        directive: String,
        /// The filter parser's report.
        #[source]
        source: ParseError,
    },

    /// Another global tracing subscriber was installed first.
    #[error("a global tracing subscriber is already installed")]
    SubscriberTaken(#[source] TryInitError),

    /// The metrics address does not parse.
    #[error("metrics address `{addr}` is not a socket address")]
    MetricsAddr {
        /// The configured address.
        addr: String,
        /// The parse failure.
        #[source]
        source: AddrParseError,
    },

    /// The Prometheus recorder could not be built.
    #[error("cannot build the Prometheus recorder")]
    Recorder(#[source] BuildError),

    /// Another global metrics recorder was installed first.
    #[error("a global metrics recorder is already installed")]
    RecorderTaken,

    /// The scrape endpoint stopped serving.
    #[error("Prometheus exporter stopped: {0}")]
    Exporter(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_metrics_addr_keeps_parse_error() {
        let source = "nowhere".parse::<std::net::SocketAddr>().unwrap_err();
        let err = TelemetryError::MetricsAddr {
            addr: "nowhere".to_string(),
            source,
        };
        assert_eq!(
            err.to_string(),
            "metrics address `nowhere` is not a socket address"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn test_log_filter_names_directive() {
        let source = tracing_subscriber::EnvFilter::try_new("users=[").unwrap_err();
        let err = TelemetryError::LogFilter {
            directive: "users=[".to_string(),
            source,
        };
        assert_eq!(err.to_string(), "log level `users=[` is not a valid filter");
    }
}
