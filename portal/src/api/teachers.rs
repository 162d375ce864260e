//! Endpoints scoped to the authenticated teacher.

use crate::auth::AuthenticatedTeacher;
use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use portal_core::{
    AccessibilityCategoryId, Enrollment, EnrollmentId, EnrollmentService, EnrollmentStatus,
    EventId, Guest,
};
use portal_web::AppError;
use serde::Serialize;

/// One of the caller's enrollments.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentSummary {
    /// Enrollment id
    pub enrollment_id: EnrollmentId,
    /// Event
    pub event_id: EventId,
    /// Current status
    pub status: EnrollmentStatus,
    /// Guests attached
    pub guest_count: u32,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl From<Enrollment> for EnrollmentSummary {
    fn from(enrollment: Enrollment) -> Self {
        Self {
            enrollment_id: enrollment.id,
            event_id: enrollment.event_id,
            status: enrollment.status,
            guest_count: enrollment.guest_count,
            created_at: enrollment.created_at,
        }
    }
}

/// The caller's enrollments, newest first.
///
/// # Errors
///
/// 401 if the token is invalid.
pub async fn my_enrollments(
    State(service): State<EnrollmentService>,
    AuthenticatedTeacher(identity): AuthenticatedTeacher,
) -> Result<Json<Vec<EnrollmentSummary>>, AppError> {
    let enrollments = service.enrollments_for_teacher(identity.teacher_id).await?;
    Ok(Json(
        enrollments
            .into_iter()
            .map(EnrollmentSummary::from)
            .collect(),
    ))
}

/// Response of `GET /api/me/accessibility`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilityResponse {
    /// Declared categories
    pub category_ids: Vec<AccessibilityCategoryId>,
}

/// The caller's declared accessibility categories.
///
/// # Errors
///
/// 401 if the token is invalid.
pub async fn my_accessibility(
    State(service): State<EnrollmentService>,
    AuthenticatedTeacher(identity): AuthenticatedTeacher,
) -> Result<Json<AccessibilityResponse>, AppError> {
    let category_ids = service.accessibility_for(identity.teacher_id).await?;
    Ok(Json(AccessibilityResponse { category_ids }))
}

/// A guest of the caller's enrollment.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestSummary {
    /// Guest national ID
    pub guest_national_id: String,
    /// Guest name
    pub guest_name: String,
}

impl From<Guest> for GuestSummary {
    fn from(guest: Guest) -> Self {
        Self {
            guest_national_id: guest.national_id,
            guest_name: guest.name,
        }
    }
}

/// Guests of the caller's enrollment in an event.
///
/// # Errors
///
/// 401 if the token is invalid, 404 if the caller has no enrollment in the event.
pub async fn my_guests(
    State(service): State<EnrollmentService>,
    AuthenticatedTeacher(identity): AuthenticatedTeacher,
    Path(event_id): Path<EventId>,
) -> Result<Json<Vec<GuestSummary>>, AppError> {
    let guests = service.guests_for(identity.teacher_id, event_id).await?;
    Ok(Json(guests.into_iter().map(GuestSummary::from).collect()))
}
