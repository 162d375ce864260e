//! Axum middleware for request tracking and observability.
//!
//! [`correlation_id_layer`] gives every request:
//!
//! 1. a correlation id, taken from the `X-Correlation-ID` header or generated
//! 2. an `http_request` tracing span carrying that id
//! 3. a `portal_http_requests_total{method,status}` count and a latency histogram
//! 4. the correlation id echoed in the response header
//!
//! # Example
//!
//! ```ignore
//! use axum::Router;
//! use portal_web::middleware::correlation_id_layer;
//!
//! let app = Router::new()
//!     .route("/api/enroll", post(enroll))
//!     .layer(correlation_id_layer());
//! ```

use axum::{extract::Request, http::HeaderValue, response::Response};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Register descriptions of the HTTP metrics recorded by the middleware.
pub fn register_http_metrics() {
    describe_counter!(
        "portal_http_requests_total",
        "HTTP requests by method and status code"
    );
    describe_histogram!(
        "portal_http_request_duration_seconds",
        "HTTP request latency"
    );
}

/// Create a layer that adds correlation ID tracking to all requests.
#[must_use]
pub const fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// Layer for correlation ID tracking.
#[derive(Clone, Copy, Debug)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

/// Middleware service for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let correlation_id = req
            .headers()
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        req.extensions_mut().insert(correlation_id);

        let method = req.method().to_string();
        let span = tracing::info_span!(
            "http_request",
            correlation_id = %correlation_id,
            method = %method,
            uri = %req.uri(),
        );

        let started = Instant::now();
        let fut = self.inner.call(req);

        Box::pin(
            async move {
                let mut response = fut.await?;

                let status = response.status();
                let elapsed = started.elapsed();
                counter!(
                    "portal_http_requests_total",
                    "method" => method,
                    "status" => status.as_u16().to_string(),
                )
                .increment(1);
                histogram!("portal_http_request_duration_seconds").record(elapsed.as_secs_f64());
                tracing::debug!(
                    status = status.as_u16(),
                    latency_ms = elapsed.as_millis(),
                    "Request completed"
                );

                if let Ok(header_value) = HeaderValue::from_str(&correlation_id.to_string()) {
                    response
                        .headers_mut()
                        .insert(CORRELATION_ID_HEADER, header_value);
                }

                Ok(response)
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::Request, response::IntoResponse, routing::get};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_correlation_id_generated_if_missing() {
        let app = Router::new()
            .route("/test", get(|| async { "ok" }))
            .layer(correlation_id_layer());

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        let correlation_id = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .expect("Correlation ID header should be present");
        assert!(Uuid::parse_str(correlation_id.to_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_correlation_id_preserved_from_request() {
        let app = Router::new()
            .route("/test", get(|| async { "ok" }))
            .layer(correlation_id_layer());

        let request_uuid = Uuid::new_v4();
        let request = Request::builder()
            .uri("/test")
            .header(CORRELATION_ID_HEADER, request_uuid.to_string())
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let response_id = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .expect("Correlation ID header should be present")
            .to_str()
            .unwrap();

        assert_eq!(response_id, request_uuid.to_string());
    }

    #[tokio::test]
    async fn test_correlation_id_in_extensions() {
        async fn handler(req: Request<Body>) -> impl IntoResponse {
            req.extensions()
                .get::<Uuid>()
                .map_or_else(|| "missing".to_string(), |id| id.to_string())
        }

        let app = Router::new()
            .route("/test", get(handler))
            .layer(correlation_id_layer());

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let header = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], header.as_bytes());
    }

    #[tokio::test]
    async fn test_invalid_uuid_generates_new() {
        let app = Router::new()
            .route("/test", get(|| async { "ok" }))
            .layer(correlation_id_layer());

        let request = Request::builder()
            .uri("/test")
            .header(CORRELATION_ID_HEADER, "not-a-uuid")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let uuid_str = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .expect("Correlation ID header should be present")
            .to_str()
            .unwrap();

        assert!(Uuid::parse_str(uuid_str).is_ok());
        assert_ne!(uuid_str, "not-a-uuid");
    }
}
