//! Health check endpoints.
//!
//! Used by load balancers and orchestrators to decide whether the service is alive
//! and whether it should receive traffic.

use axum::{Json, extract::State, http::StatusCode};
use portal_core::EnrollmentService;
use serde::Serialize;

/// Liveness response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,
    /// Service version
    pub version: &'static str,
}

/// Liveness check.
///
/// Returns 200 OK while the process is running. Does not touch the database.
///
/// ```text
/// GET /health
/// {"status":"ok","version":"0.1.0"}
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

/// Readiness response.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    /// Overall readiness
    pub ready: bool,
    /// Database connectivity
    pub database: bool,
}

/// Readiness check.
///
/// Pings the store; 503 when the database is unreachable.
///
/// ```text
/// GET /ready
/// {"ready":true,"database":true}
/// ```
pub async fn readiness_check(
    State(service): State<EnrollmentService>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let database = match service.ping().await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, "Readiness check failed");
            false
        }
    };

    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadinessResponse {
            ready: database,
            database,
        }),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use portal_testing::{InMemoryEnrollmentStore, test_clock};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_simple_health_check() {
        let (status, Json(body)) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
    }

    #[tokio::test]
    async fn test_readiness_with_reachable_store() {
        let service = EnrollmentService::new(
            Arc::new(InMemoryEnrollmentStore::new()),
            Arc::new(test_clock()),
        );

        let (status, Json(body)) = readiness_check(State(service)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.ready);
        assert!(body.database);
    }
}
