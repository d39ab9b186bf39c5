//! The HTTP endpoint of one service method.
//!
//! [`dispatch`] decodes the request, runs the decorated method and encodes
//! its outcome. Every runtime failure, panics included, ends here as a
//! well-formed response:
//!
//! | Situation | Response |
//! |-----------|----------|
//! | success with a response | 200, body, `content-type` = request `accept` |
//! | success without a response | 200, empty body |
//! | decode or handler error | status of the first `HttpError` in the chain, else 500 |
//! | error with a response | that status, plus the encoded body |
//! | encode failure on success | status of the encode error (406), else 500, empty body |
//! | panic | 500, empty body, no `content-type` |

use std::any::Any;
use std::panic::AssertUnwindSafe;

use bindery_codec::{status_of, JsonFormat, RequestParts};
use bindery_core::{MethodEntry, Outcome, RequestContext};
use bindery_telemetry::Report;
use bytes::Bytes;
use futures_util::FutureExt;
use http::header::{self, HeaderValue};
use http::{Response, StatusCode};
use http_body_util::Full;

/// Body type of every response.
pub type ResponseBody = Full<Bytes>;

/// Serves one request with `entry`.
///
/// `format` selects pretty or compact JSON bodies.
pub async fn dispatch(
    entry: &MethodEntry,
    ctx: RequestContext,
    parts: &RequestParts,
    format: JsonFormat,
) -> Response<ResponseBody> {
    let request_id = ctx.request_id();

    match AssertUnwindSafe(respond(entry, ctx, parts, format))
        .catch_unwind()
        .await
    {
        Ok(response) => response,
        Err(panic) => {
            tracing::error!(
                method = %entry.name(),
                request_id = %request_id,
                panic = panic_message(panic.as_ref()),
                "Method panicked"
            );
            respond_with(StatusCode::INTERNAL_SERVER_ERROR, None, None)
        }
    }
}

async fn respond(
    entry: &MethodEntry,
    ctx: RequestContext,
    parts: &RequestParts,
    format: JsonFormat,
) -> Response<ResponseBody> {
    let request_id = ctx.request_id();
    let binding = entry.binding();

    let request = match binding.decode(parts) {
        Ok(request) => request,
        Err(error) => {
            let status = error
                .status()
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            tracing::warn!(
                method = %entry.name(),
                request_id = %request_id,
                status = status.as_u16(),
                error = %Report::new(&error),
                "Failed decoding request"
            );
            return respond_with(status, None, None);
        }
    };

    let Outcome { response, error } = entry.invoke(ctx, request).await;
    let accept = parts.headers().get(header::ACCEPT);

    let Some(error) = error else {
        let Some(response) = response else {
            return respond_with(StatusCode::OK, None, None);
        };

        return match binding.encode(Some(&*response), parts.accept(), format) {
            Ok(body) => respond_with(StatusCode::OK, accept, body),
            Err(error) => {
                let status = error
                    .status()
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                tracing::warn!(
                    method = %entry.name(),
                    request_id = %request_id,
                    status = status.as_u16(),
                    error = %Report::new(&error),
                    "Failed encoding response"
                );
                respond_with(status, None, None)
            }
        };
    };

    let status = status_of(&*error).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    tracing::error!(
        method = %entry.name(),
        request_id = %request_id,
        status = status.as_u16(),
        error = %Report::new(&*error),
        "Method returned an error"
    );

    let Some(response) = response else {
        return respond_with(status, None, None);
    };

    // A response that comes with an error is still sent, under the error's status.
    match binding.encode(Some(&*response), parts.accept(), format) {
        Ok(body) => respond_with(status, accept, body),
        Err(encode_error) => {
            tracing::error!(
                method = %entry.name(),
                request_id = %request_id,
                error = %Report::new(&encode_error),
                "Failed encoding response"
            );
            respond_with(status, accept, None)
        }
    }
}

fn respond_with(
    status: StatusCode,
    content_type: Option<&HeaderValue>,
    body: Option<Bytes>,
) -> Response<ResponseBody> {
    let mut response = Response::new(Full::new(body.unwrap_or_default()));
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type.clone());
    }
    response
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_codec::{BoxError, HttpError};
    use bindery_core::{Environment, Service};
    use bindery_macros::{HttpRequest, HttpResponse};
    use http::Uri;
    use http_body_util::BodyExt;
    use serde::Serialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Default, HttpRequest)]
    struct Lookup {
        #[http("path")]
        id: u32,
    }

    #[derive(Debug, Serialize, HttpResponse)]
    struct Found {
        #[http("body")]
        #[serde(rename = "P")]
        p: String,
    }

    fn parts(uri: &'static str, id: &str, accept: Option<&str>) -> RequestParts {
        let builder = RequestParts::builder()
            .uri(Uri::from_static(uri))
            .path_param("id", id);
        match accept {
            Some(accept) => builder.header("accept", accept).build(),
            None => builder.build(),
        }
    }

    async fn serve(
        service: &Service,
        parts: &RequestParts,
    ) -> (StatusCode, Option<String>, Bytes) {
        let entry = service.entry("Lookup").expect("registered");
        let response = dispatch(&entry, RequestContext::new(), parts, JsonFormat::Pretty).await;
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, content_type, body)
    }

    fn service_with<F, Fut>(handler: F) -> Service
    where
        F: Fn(RequestContext, Lookup) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Outcome<Found>> + Send + 'static,
    {
        let service = Service::new("lookup", Environment::Development);
        service.add_method("Lookup", handler).unwrap();
        service
    }

    #[tokio::test]
    async fn test_success_encodes_body() {
        let service = service_with(|_ctx, req: Lookup| async move {
            Outcome::ok(Found { p: format!("v{}", req.id) })
        });

        let (status, content_type, body) =
            serve(&service, &parts("/things/1", "1", Some("application/json"))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(&body[..], b"{\n  \"P\": \"v1\"\n}\n");
    }

    #[tokio::test]
    async fn test_success_without_response() {
        let service = service_with(|_ctx, _req: Lookup| async { Outcome::empty() });

        let (status, content_type, body) =
            serve(&service, &parts("/things/1", "1", Some("application/json"))).await;

        assert_eq!(status, StatusCode::OK);
        assert!(content_type.is_none());
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_unacceptable_accept_is_406() {
        let service = service_with(|_ctx, _req: Lookup| async {
            Outcome::ok(Found { p: "v".into() })
        });

        let (status, content_type, body) =
            serve(&service, &parts("/things/1", "1", Some("text/html"))).await;

        assert_eq!(status, StatusCode::NOT_ACCEPTABLE);
        assert!(content_type.is_none());
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_handler_error_status_from_chain() {
        let service = service_with(|_ctx, _req: Lookup| async {
            Outcome::err(HttpError::new(StatusCode::NOT_FOUND, "no such thing"))
        });

        let (status, _, body) =
            serve(&service, &parts("/things/1", "1", Some("application/json"))).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_plain_error_is_500() {
        let service = service_with(|_ctx, _req: Lookup| async {
            Outcome::<Found>::err(BoxError::from("boom"))
        });

        let (status, content_type, _) =
            serve(&service, &parts("/things/1", "1", Some("application/json"))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(content_type.is_none());
    }

    #[tokio::test]
    async fn test_error_with_response_sends_both() {
        let service = service_with(|_ctx, _req: Lookup| async {
            Outcome::with_error(
                Found { p: "v".into() },
                HttpError::new(StatusCode::CONFLICT, "stale"),
            )
        });

        let (status, content_type, body) =
            serve(&service, &parts("/things/1", "1", Some("application/json"))).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(&body[..], b"{\n  \"P\": \"v\"\n}\n");
    }

    #[tokio::test]
    async fn test_decode_failure_skips_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let service = service_with(move |_ctx, _req: Lookup| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Outcome::ok(Found { p: "v".into() }) }
        });

        let (status, content_type, body) =
            serve(&service, &parts("/things/x", "x", Some("application/json"))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(content_type.is_none());
        assert!(body.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_panic_is_500_without_body() {
        let service = service_with(|_ctx, req: Lookup| async move {
            if req.id == 1 {
                panic!("handler exploded");
            }
            Outcome::<Found>::empty()
        });

        let (status, content_type, body) =
            serve(&service, &parts("/things/1", "1", Some("application/json"))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(content_type.is_none());
        assert!(body.is_empty());
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");

        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");

        let boxed: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
