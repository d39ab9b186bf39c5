//! Method middleware for logging and latency metrics.
//!
//! ```rust,ignore
//! use bindery_telemetry::middleware;
//!
//! service.add_middleware(middleware::method_duration());
//! service.add_middleware(middleware::logging());
//! ```

use crate::metrics::METHOD_DURATION_SECONDS;
use crate::report::Report;
use bindery_core::{Method, Middleware, Payload, RequestContext, ServiceInfo};
use futures_util::FutureExt;
use std::sync::Arc;
use std::time::Instant;

/// Logs every invocation with its request, response and error.
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodLogging;

/// Returns the method logging middleware.
#[must_use]
pub const fn logging() -> MethodLogging {
    MethodLogging
}

impl Middleware for MethodLogging {
    fn wrap(&self, service: &ServiceInfo, method: &str, next: Method) -> Method {
        let service: Arc<str> = service.name().into();
        let method: Arc<str> = method.into();

        Arc::new(move |ctx: RequestContext, request: Box<dyn Payload>| {
            let next = Arc::clone(&next);
            let service = Arc::clone(&service);
            let method = Arc::clone(&method);

            async move {
                let request_id = ctx.request_id();
                let request_dump = format!("{request:?}");
                let outcome = next(ctx, request).await;

                match &outcome.error {
                    Some(error) => tracing::error!(
                        service = %service,
                        method = %method,
                        request_id = %request_id,
                        request = %request_dump,
                        response = ?outcome.response,
                        error = %Report::new(&**error),
                        "Method failed"
                    ),
                    None => tracing::info!(
                        service = %service,
                        method = %method,
                        request_id = %request_id,
                        request = %request_dump,
                        response = ?outcome.response,
                        "Method invoked"
                    ),
                }
                outcome
            }
            .boxed()
        })
    }
}

/// Records `bindery_service_method_duration_seconds` for every invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodDuration;

/// Returns the method duration middleware.
#[must_use]
pub const fn method_duration() -> MethodDuration {
    MethodDuration
}

impl Middleware for MethodDuration {
    fn wrap(&self, service: &ServiceInfo, method: &str, next: Method) -> Method {
        let labels = Arc::new([
            ("service", service.name().to_string()),
            ("method", method.to_string()),
        ]);

        Arc::new(move |ctx: RequestContext, request: Box<dyn Payload>| {
            let labels = Arc::clone(&labels);
            let started = Instant::now();
            let invocation = next(ctx, request);

            async move {
                let outcome = invocation.await;
                metrics::histogram!(METHOD_DURATION_SECONDS, &*labels)
                    .record(started.elapsed().as_secs_f64());
                outcome
            }
            .boxed()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_core::{Environment, Outcome};
    use metrics_exporter_prometheus::PrometheusBuilder;

    fn echo() -> Method {
        Arc::new(|_ctx: RequestContext, request: Box<dyn Payload>| {
            futures_util::future::ready(Outcome::ok(request)).boxed()
        })
    }

    fn failing() -> Method {
        Arc::new(|_ctx: RequestContext, _request: Box<dyn Payload>| {
            futures_util::future::ready(Outcome::<Box<dyn Payload>>::err("boom")).boxed()
        })
    }

    fn info() -> ServiceInfo {
        ServiceInfo::new("users", Environment::Development)
    }

    #[tokio::test]
    async fn test_logging_passes_outcome_through() {
        let method = logging().wrap(&info(), "Echo", echo());
        let outcome = method(RequestContext::new(), Box::new("hello".to_string())).await;

        let response = outcome.response.expect("response expected");
        assert_eq!(
            (*response).as_any().downcast_ref::<String>().map(String::as_str),
            Some("hello")
        );
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn test_logging_keeps_error() {
        let method = logging().wrap(&info(), "Fail", failing());
        let outcome = method(RequestContext::new(), Box::new(1_u8)).await;

        assert!(outcome.response.is_none());
        assert_eq!(outcome.error.map(|e| e.to_string()).as_deref(), Some("boom"));
    }

    #[test]
    fn test_method_duration_records_histogram() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        let outcome = metrics::with_local_recorder(&recorder, || {
            let method = method_duration().wrap(&info(), "Fail", failing());
            tokio_test::block_on(method(RequestContext::new(), Box::new(1_u8)))
        });
        assert!(outcome.error.is_some());

        let rendered = handle.render();
        assert!(rendered.contains(METHOD_DURATION_SECONDS));
        assert!(rendered.contains("service=\"users\""));
        assert!(rendered.contains("method=\"Fail\""));
    }
}
