//! Enrollment endpoints: enroll, add guests, status and cancellation.
//!
//! JSON bodies use camelCase. Payload rules that the engine cannot see (the
//! `hasAccessibilityNeeds` / `hasGuests` flags) are applied here before the request
//! reaches [`EnrollmentService`].

use crate::auth::AuthenticatedTeacher;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use portal_core::{
    AccessibilityCategoryId, CancelTarget, CancelTransition, EnrollmentError, EnrollmentId,
    EnrollmentRequest, EnrollmentService, EnrollmentStatus, EventId, GuestCounts, NewGuest,
    TeacherId,
};
use portal_web::{AppError, ValidatedJson};
use serde::{Deserialize, Serialize};

/// A guest as sent by clients.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestPayload {
    /// Guest national ID
    pub guest_national_id: String,
    /// Guest name
    pub guest_name: String,
}

impl From<GuestPayload> for NewGuest {
    fn from(guest: GuestPayload) -> Self {
        Self::new(guest.guest_national_id, guest.guest_name)
    }
}

// ============================================================================
// Enroll
// ============================================================================

/// Request body of `POST /api/enrollments`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollBody {
    /// Enrolling teacher
    pub teacher_id: TeacherId,
    /// Target event
    pub event_id: EventId,
    /// Whether the teacher declares accessibility needs
    #[serde(default)]
    pub has_accessibility_needs: bool,
    /// Declared categories, required when `hasAccessibilityNeeds` is true
    #[serde(default)]
    pub accessibility_category_ids: Option<Vec<AccessibilityCategoryId>>,
    /// Whether the teacher brings guests
    #[serde(default)]
    pub has_guests: bool,
    /// Guests, required when `hasGuests` is true
    #[serde(default)]
    pub guests: Option<Vec<GuestPayload>>,
}

impl EnrollBody {
    /// Apply the flag rules and build the engine request.
    ///
    /// # Errors
    ///
    /// Returns [`EnrollmentError::Validation`] when a flag is set but its list is
    /// missing or empty.
    pub fn into_request(self) -> Result<EnrollmentRequest, EnrollmentError> {
        let accessibility = if self.has_accessibility_needs {
            match self.accessibility_category_ids {
                Some(ids) if !ids.is_empty() => ids,
                _ => {
                    return Err(EnrollmentError::validation(
                        "accessibilityCategoryIds is required when hasAccessibilityNeeds is true",
                    ));
                }
            }
        } else {
            Vec::new()
        };

        let guests = if self.has_guests {
            match self.guests {
                Some(guests) if !guests.is_empty() => {
                    guests.into_iter().map(NewGuest::from).collect()
                }
                _ => {
                    return Err(EnrollmentError::validation(
                        "guests is required when hasGuests is true",
                    ));
                }
            }
        } else {
            Vec::new()
        };

        Ok(EnrollmentRequest {
            teacher_id: self.teacher_id,
            event_id: self.event_id,
            accessibility,
            guests,
        })
    }
}

/// Response of `POST /api/enrollments`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollResponse {
    /// New enrollment
    pub enrollment_id: EnrollmentId,
    /// Human-readable outcome
    pub message: String,
    /// Seats left in the event
    pub remaining_seats: u32,
    /// Guests attached
    pub guest_count: u32,
    /// Accessibility associations written
    pub accessibility_associations_written: usize,
}

/// Enroll a teacher in an event.
///
/// # Errors
///
/// 400 (validation, quota), 404 (event/teacher), 409 (duplicate, full event).
pub async fn enroll(
    State(service): State<EnrollmentService>,
    ValidatedJson(body): ValidatedJson<EnrollBody>,
) -> Result<(StatusCode, Json<EnrollResponse>), AppError> {
    let request = body.into_request()?;
    let receipt = service.enroll(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(EnrollResponse {
            enrollment_id: receipt.enrollment_id,
            message: "Enrollment completed successfully".to_string(),
            remaining_seats: receipt.remaining_seats,
            guest_count: receipt.guest_count,
            accessibility_associations_written: receipt.accessibility_written,
        }),
    ))
}

// ============================================================================
// Add guests
// ============================================================================

/// Request body of `POST /api/enrollments/guests`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddGuestsBody {
    /// Enrolled teacher
    pub teacher_id: TeacherId,
    /// Event of the enrollment
    pub event_id: EventId,
    /// Guests to add
    #[serde(default)]
    pub guests: Vec<GuestPayload>,
}

/// Response of `POST /api/enrollments/guests`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddGuestsResponse {
    /// Human-readable outcome
    pub message: String,
    /// Guests attached after the addition
    pub current_guest_count: u32,
    /// Per-teacher maximum
    pub max_guests: u32,
    /// Free slots left
    pub remaining_guest_slots: u32,
}

/// Attach more guests to an existing enrollment.
///
/// # Errors
///
/// 400 (validation, not enrolled, quota), 404 (event).
pub async fn add_guests(
    State(service): State<EnrollmentService>,
    ValidatedJson(body): ValidatedJson<AddGuestsBody>,
) -> Result<Json<AddGuestsResponse>, AppError> {
    let added = body.guests.len();
    let guests = body.guests.into_iter().map(NewGuest::from).collect();
    let receipt = service
        .add_guests(body.teacher_id, body.event_id, guests)
        .await?;

    Ok(Json(AddGuestsResponse {
        message: format!("{added} guest(s) added successfully"),
        current_guest_count: receipt.counts.current,
        max_guests: receipt.counts.max,
        remaining_guest_slots: receipt.counts.remaining,
    }))
}

// ============================================================================
// Status
// ============================================================================

/// Response of `GET /api/enrollments/status/:event_id/:teacher_id`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentStatusResponse {
    /// Whether the teacher currently holds a seat
    pub is_enrolled: bool,
    /// Most recent enrollment, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment_id: Option<EnrollmentId>,
    /// Status of that enrollment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EnrollmentStatus>,
    /// Guest counters of that enrollment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_counts: Option<GuestCounts>,
    /// Whether more guests may be added
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_add_more_guests: Option<bool>,
}

/// Look up a teacher's enrollment in an event.
///
/// # Errors
///
/// 404 if the event does not exist.
pub async fn enrollment_status(
    State(service): State<EnrollmentService>,
    Path((event_id, teacher_id)): Path<(EventId, TeacherId)>,
) -> Result<Json<EnrollmentStatusResponse>, AppError> {
    let view = service.enrollment_status(teacher_id, event_id).await?;
    let is_enrolled = view.is_enrolled();

    let response = match view.enrollment {
        Some(enrollment) => EnrollmentStatusResponse {
            is_enrolled,
            enrollment_id: Some(enrollment.id),
            status: Some(enrollment.status),
            guest_counts: view.guests,
            can_add_more_guests: Some(view.can_add_more_guests),
        },
        None => EnrollmentStatusResponse {
            is_enrolled,
            enrollment_id: None,
            status: None,
            guest_counts: None,
            can_add_more_guests: None,
        },
    };

    Ok(Json(response))
}

// ============================================================================
// Cancel
// ============================================================================

/// Request body of `POST /api/enrollments/cancel`. `enrollmentId` wins when both
/// are present.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelBody {
    /// Enrollment to cancel
    #[serde(default)]
    pub enrollment_id: Option<EnrollmentId>,
    /// Event whose enrollment to cancel
    #[serde(default)]
    pub event_id: Option<EventId>,
}

impl CancelBody {
    fn target(&self) -> Result<CancelTarget, EnrollmentError> {
        match (self.enrollment_id, self.event_id) {
            (Some(id), _) => Ok(CancelTarget::Enrollment(id)),
            (None, Some(event_id)) => Ok(CancelTarget::Event(event_id)),
            (None, None) => Err(EnrollmentError::validation(
                "either enrollmentId or eventId is required",
            )),
        }
    }
}

/// Response of `POST /api/enrollments/cancel`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    /// Human-readable outcome
    pub message: String,
    /// Cancelled enrollment
    pub enrollment_id: EnrollmentId,
    /// Seats left in the event
    pub remaining_seats: u32,
}

/// Cancel the caller's enrollment. Repeating the call is a successful no-op.
///
/// # Errors
///
/// 401 (token), 400 (no target), 404 (enrollment or `Cancelled` status missing).
pub async fn cancel(
    State(service): State<EnrollmentService>,
    AuthenticatedTeacher(identity): AuthenticatedTeacher,
    ValidatedJson(body): ValidatedJson<CancelBody>,
) -> Result<Json<CancelResponse>, AppError> {
    let target = body.target()?;
    let receipt = service.cancel(identity.teacher_id, target).await?;

    if receipt.transition == CancelTransition::AlreadyCancelled {
        tracing::debug!(enrollment_id = %receipt.enrollment_id, "Cancellation repeated");
    }

    Ok(Json(CancelResponse {
        message: "Enrollment cancelled successfully".to_string(),
        enrollment_id: receipt.enrollment_id,
        remaining_seats: receipt.remaining_seats,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use portal_core::ErrorKind;

    fn body(json: &str) -> EnrollBody {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_flags_off_ignore_lists() {
        let request = body(
            r#"{"teacherId":1,"eventId":2,"hasAccessibilityNeeds":false,
                "accessibilityCategoryIds":[1,3],"hasGuests":false,
                "guests":[{"guestNationalId":"9","guestName":"Ana"}]}"#,
        )
        .into_request()
        .unwrap();

        assert!(request.accessibility.is_empty());
        assert!(request.guests.is_empty());
    }

    #[test]
    fn test_flags_on_require_lists() {
        for json in [
            r#"{"teacherId":1,"eventId":2,"hasAccessibilityNeeds":true}"#,
            r#"{"teacherId":1,"eventId":2,"hasAccessibilityNeeds":true,"accessibilityCategoryIds":[]}"#,
            r#"{"teacherId":1,"eventId":2,"hasGuests":true,"guests":[]}"#,
        ] {
            let err = body(json).into_request().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{json}");
        }
    }

    #[test]
    fn test_guest_payload_is_trimmed() {
        let request = body(
            r#"{"teacherId":1,"eventId":2,"hasGuests":true,
                "guests":[{"guestNationalId":" 77 ","guestName":" Ana "}]}"#,
        )
        .into_request()
        .unwrap();

        assert_eq!(request.guests, vec![NewGuest::new("77", "Ana")]);
    }

    #[test]
    fn test_cancel_target_precedence() {
        let both: CancelBody = serde_json::from_str(r#"{"enrollmentId":5,"eventId":7}"#).unwrap();
        assert_eq!(
            both.target().unwrap(),
            CancelTarget::Enrollment(EnrollmentId::new(5))
        );

        let neither: CancelBody = serde_json::from_str("{}").unwrap();
        assert_eq!(neither.target().unwrap_err().kind(), ErrorKind::Validation);
    }
}
