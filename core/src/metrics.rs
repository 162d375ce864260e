//! Business metrics for the enrollment engine.
//!
//! # Exported Metrics
//!
//! - `portal_enrollments_total{outcome}` - enrollment attempts by outcome
//! - `portal_cancellations_total{outcome}` - cancellations (`cancelled`, `already_cancelled`, `rejected`)
//! - `portal_guests_added_total` - guests attached after enrollment
//! - `portal_transactions_rolled_back_total{operation}` - rolled-back transactions
//!
//! Recording is a no-op until a recorder is installed (the server installs the
//! Prometheus exporter).

use crate::error::{EnrollmentError, ErrorKind};
use metrics::{counter, describe_counter};

/// Register metric descriptions. Call once at startup.
pub fn register_metrics() {
    describe_counter!(
        "portal_enrollments_total",
        "Enrollment attempts by outcome (enrolled, conflict, capacity_exceeded, ...)"
    );
    describe_counter!(
        "portal_cancellations_total",
        "Cancellation requests by outcome (cancelled, already_cancelled, rejected)"
    );
    describe_counter!(
        "portal_guests_added_total",
        "Guests attached to existing enrollments"
    );
    describe_counter!(
        "portal_transactions_rolled_back_total",
        "Transactions rolled back, by operation"
    );
}

const fn outcome_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::NotFound => "not_found",
        ErrorKind::Conflict => "conflict",
        ErrorKind::CapacityExceeded => "capacity_exceeded",
        ErrorKind::QuotaExceeded => "quota_exceeded",
        ErrorKind::InvalidToken => "invalid_token",
        ErrorKind::Validation => "invalid",
        ErrorKind::Internal => "internal_error",
    }
}

/// Record the outcome of an enrollment attempt.
pub fn record_enrollment(outcome: Result<(), &EnrollmentError>) {
    let label = match outcome {
        Ok(()) => "enrolled",
        Err(err) => outcome_label(err.kind()),
    };
    counter!("portal_enrollments_total", "outcome" => label).increment(1);
}

/// Record the outcome of a cancellation request.
pub fn record_cancellation(label: &'static str) {
    counter!("portal_cancellations_total", "outcome" => label).increment(1);
}

/// Record guests attached to an existing enrollment.
pub fn record_guests_added(count: usize) {
    counter!("portal_guests_added_total").increment(count as u64);
}

/// Record a rolled-back transaction.
pub fn record_rollback(operation: &'static str) {
    counter!("portal_transactions_rolled_back_total", "operation" => operation).increment(1);
}
