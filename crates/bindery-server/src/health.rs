//! The built-in `GET /health` heartbeat.
//!
//! A serving process answers 200 with `"state": "serving"`. Once shutdown
//! starts it answers 503 with `"state": "draining"` while open requests
//! finish, so balancers stop routing to it.
//!
//! ```rust
//! use bindery_server::{HealthCheck, Liveness};
//!
//! let health = HealthCheck::new("users", "1.0.0");
//! let report = health.report(3, false);
//! assert_eq!(report.state, Liveness::Serving);
//! assert_eq!(report.methods, 3);
//! ```

use std::time::{Duration, Instant};

use http::StatusCode;
use serde::{Deserialize, Serialize};

/// Whether the process still takes new requests.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Liveness {
    /// Accepting requests.
    Serving,
    /// Shutting down; open requests are finishing.
    Draining,
}

impl Liveness {
    /// The status code `/health` answers with.
    #[must_use]
    pub fn status_code(self) -> StatusCode {
        match self {
            Self::Serving => StatusCode::OK,
            Self::Draining => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Body of the `/health` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    /// Serving or draining.
    pub state: Liveness,
    /// Service name.
    pub service: String,
    /// Reported version.
    pub version: String,
    /// Whole seconds since the server was built.
    pub uptime_seconds: u64,
    /// Number of methods registered when the report was taken.
    pub methods: usize,
}

/// Identity and start time of a running server.
#[derive(Debug, Clone)]
pub struct HealthCheck {
    service: String,
    version: String,
    started: Instant,
}

impl HealthCheck {
    /// Starts the uptime clock for `service`.
    #[must_use]
    pub fn new(service: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            version: version.into(),
            started: Instant::now(),
        }
    }

    /// Takes a report for a server with `methods` registered methods.
    #[must_use]
    pub fn report(&self, methods: usize, draining: bool) -> HealthStatus {
        HealthStatus {
            state: if draining {
                Liveness::Draining
            } else {
                Liveness::Serving
            },
            service: self.service.clone(),
            version: self.version.clone(),
            uptime_seconds: self.uptime().as_secs(),
            methods,
        }
    }

    /// Returns the time since the check was created.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Returns the service name.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Returns the reported version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_serialization() {
        let health = HealthCheck::new("users", "1.2.3");
        let mut json = serde_json::to_value(health.report(2, false)).unwrap();
        json["uptime_seconds"] = serde_json::json!(0);

        assert_eq!(
            json,
            serde_json::json!({
                "state": "serving",
                "service": "users",
                "version": "1.2.3",
                "uptime_seconds": 0,
                "methods": 2
            })
        );
    }

    #[test]
    fn test_draining_report_is_unavailable() {
        let health = HealthCheck::new("users", "0.1.0");
        let report = health.report(0, true);

        assert_eq!(report.state, Liveness::Draining);
        assert_eq!(report.state.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(Liveness::Serving.status_code(), StatusCode::OK);
        assert!(report.uptime_seconds <= health.uptime().as_secs());
    }
}
