//! Prometheus metrics for Bindery services.
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `bindery_service_method_duration_seconds` | Histogram | `service`, `method` | Method invocation latency |
//!
//! The exporter serves the Prometheus text format over HTTP. It is returned
//! as a future so the application can run it next to its other daemons.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{describe_histogram, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::future::Future;
use std::net::SocketAddr;

/// Name of the method duration histogram.
pub const METHOD_DURATION_SECONDS: &str = "bindery_service_method_duration_seconds";

/// Histogram buckets for method durations: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms,
/// 250ms, 500ms, 1s, 2.5s, 5s, 10s.
pub const DURATION_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsConfig {
    /// Whether metrics are exported.
    pub enabled: bool,

    /// Address to expose metrics on (e.g., "0.0.0.0:9090").
    pub addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            addr: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Registers descriptions for the standard metrics.
pub fn describe_metrics() {
    describe_histogram!(
        METHOD_DURATION_SECONDS,
        Unit::Seconds,
        "Duration of service method invocations in seconds"
    );
}

/// Installs the global Prometheus recorder and returns the exporter.
///
/// The returned future serves the scrape endpoint until it fails; run it as
/// a daemon. Returns `Ok(None)` when metrics are disabled. Must be called
/// from within a Tokio runtime.
///
/// # Errors
///
/// Returns an error if the address is invalid, the listener cannot be
/// bound, or a global recorder is already installed.
pub fn prometheus_exporter(
    config: &MetricsConfig,
) -> TelemetryResult<Option<impl Future<Output = TelemetryResult<()>> + Send + 'static>> {
    if !config.enabled {
        return Ok(None);
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|source| TelemetryError::MetricsAddr {
            addr: config.addr.clone(),
            source,
        })?;

    let (recorder, exporter) = PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full(METHOD_DURATION_SECONDS.to_string()),
            DURATION_BUCKETS,
        )
        .map_err(TelemetryError::Recorder)?
        .build()
        .map_err(TelemetryError::Recorder)?;

    metrics::set_global_recorder(recorder).map_err(|_| TelemetryError::RecorderTaken)?;
    describe_metrics();

    tracing::info!(%addr, "Serving Prometheus metrics");

    Ok(Some(async move {
        exporter
            .await
            .map_err(|e| TelemetryError::Exporter(format!("{e:?}")))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MetricsConfig::default();
        assert!(config.enabled);
        assert_eq!(config.addr, "0.0.0.0:9090");
    }

    #[test]
    fn test_disabled_exporter() {
        let config = MetricsConfig {
            enabled: false,
            ..MetricsConfig::default()
        };
        assert!(prometheus_exporter(&config).unwrap().is_none());
    }

    #[test]
    fn test_invalid_address() {
        let config = MetricsConfig {
            enabled: true,
            addr: "not an address".to_string(),
        };
        let err = prometheus_exporter(&config).err().unwrap();
        assert!(matches!(err, TelemetryError::MetricsAddr { .. }));
    }

    #[test]
    fn test_buckets_are_sorted() {
        assert!(DURATION_BUCKETS.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
