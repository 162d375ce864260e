//! Application state for the portal HTTP server.

use axum::extract::FromRef;
use metrics_exporter_prometheus::PrometheusHandle;
use portal_auth::IdentityTokenAuthenticator;
use portal_core::EnrollmentService;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Enrollment transaction engine
    pub service: EnrollmentService,

    /// Identity token issuer and verifier
    pub authenticator: IdentityTokenAuthenticator,

    /// Prometheus handle rendering `/metrics`
    pub metrics: PrometheusHandle,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub const fn new(
        service: EnrollmentService,
        authenticator: IdentityTokenAuthenticator,
        metrics: PrometheusHandle,
    ) -> Self {
        Self {
            service,
            authenticator,
            metrics,
        }
    }
}

impl FromRef<AppState> for EnrollmentService {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.service.clone()
    }
}

impl FromRef<AppState> for IdentityTokenAuthenticator {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.authenticator.clone()
    }
}

impl FromRef<AppState> for PrometheusHandle {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.metrics.clone()
    }
}
