//! Prometheus export of the portal metrics.
//!
//! # Exported Metrics
//!
//! - `portal_enrollments_total{outcome}`
//! - `portal_cancellations_total{outcome}`
//! - `portal_guests_added_total`
//! - `portal_identity_tokens_issued_total`
//! - `portal_transactions_rolled_back_total{operation}`
//! - `portal_http_requests_total{method,status}`
//! - `portal_http_request_duration_seconds`

use metrics::describe_counter;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

/// Errors from metrics setup.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build the exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install the global recorder
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

fn builder() -> Result<PrometheusBuilder, MetricsError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            LATENCY_BUCKETS,
        )
        .map_err(|e| MetricsError::Build(e.to_string()))
}

/// Install the Prometheus recorder and register all metric descriptions.
///
/// # Errors
///
/// Returns [`MetricsError`] if a recorder is already installed.
pub fn install() -> Result<PrometheusHandle, MetricsError> {
    let handle = builder()?
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;
    register_metrics();
    tracing::info!("Prometheus metrics recorder installed");
    Ok(handle)
}

/// A handle to a recorder that is not installed globally. Renders nothing until
/// metrics are recorded through it; used by tests.
///
/// # Errors
///
/// Returns [`MetricsError::Build`] if the exporter configuration is invalid.
pub fn detached_handle() -> Result<PrometheusHandle, MetricsError> {
    Ok(builder()?.build_recorder().handle())
}

/// Register descriptions of every metric the portal records.
pub fn register_metrics() {
    portal_core::metrics::register_metrics();
    portal_web::register_http_metrics();
    describe_counter!(
        "portal_identity_tokens_issued_total",
        "Identity tokens issued"
    );
}

/// Record an issued identity token.
pub fn record_token_issued() {
    metrics::counter!("portal_identity_tokens_issued_total").increment(1);
}
