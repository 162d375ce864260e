//! Event occupancy for administrators.

use axum::{
    Json,
    extract::{Path, State},
};
use portal_core::{EnrollmentService, EventId, OccupancyReport};
use portal_web::AppError;

/// Seats, enrollments and guest allowance of one event.
///
/// # Errors
///
/// 404 if the event does not exist.
pub async fn event_occupancy(
    State(service): State<EnrollmentService>,
    Path(event_id): Path<EventId>,
) -> Result<Json<OccupancyReport>, AppError> {
    Ok(Json(service.occupancy(event_id).await?))
}
