//! Router configuration for the teacher portal.

use super::state::AppState;
use crate::api::{enrollments, events, teachers};
use crate::auth::handlers::{current_identity, issue_identity_token};
use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use portal_web::correlation_id_layer;
use portal_web::handlers::{health_check, readiness_check};

/// Build the complete Axum router.
///
/// ```text
/// GET  /health                                      liveness
/// GET  /ready                                       database ping
/// GET  /metrics                                     Prometheus text format
/// POST /api/enrollments                             enroll
/// POST /api/enrollments/guests                      add guests
/// GET  /api/enrollments/status/:event_id/:teacher_id
/// POST /api/enrollments/cancel                      bearer token
/// POST /api/identity/token                          issue identity token
/// GET  /api/identity/me                             bearer token
/// GET  /api/me/enrollments                          bearer token
/// GET  /api/me/accessibility                        bearer token
/// GET  /api/me/events/:event_id/guests              bearer token
/// GET  /api/events/:event_id/occupancy
/// ```
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Enrollment
        .route("/enrollments", post(enrollments::enroll))
        .route("/enrollments/guests", post(enrollments::add_guests))
        .route(
            "/enrollments/status/:event_id/:teacher_id",
            get(enrollments::enrollment_status),
        )
        .route("/enrollments/cancel", post(enrollments::cancel))
        // Identity
        .route("/identity/token", post(issue_identity_token))
        .route("/identity/me", get(current_identity))
        // Caller-scoped reads
        .route("/me/enrollments", get(teachers::my_enrollments))
        .route("/me/accessibility", get(teachers::my_accessibility))
        .route("/me/events/:event_id/guests", get(teachers::my_guests))
        // Administration
        .route(
            "/events/:event_id/occupancy",
            get(events::event_occupancy),
        );

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(render_metrics))
        .nest("/api", api_routes)
        .layer(correlation_id_layer())
        .with_state(state)
}

async fn render_metrics(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}
