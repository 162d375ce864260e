//! Axum integration for the teacher benefit portal.
//!
//! Handlers stay thin: they decode the request, call the
//! [`portal_core::EnrollmentService`], and map the result to a response.
//!
//! ```text
//! HTTP request ─▶ correlation_id_layer ─▶ extractors ─▶ handler ─▶ EnrollmentService
//!                                                         │
//!          JSON response / AppError { code, message } ◀───┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use portal_web::{AppError, ValidatedJson};
//! use axum::{Json, extract::State};
//!
//! async fn occupancy(
//!     State(service): State<EnrollmentService>,
//!     Path(event_id): Path<i64>,
//! ) -> Result<Json<OccupancyReport>, AppError> {
//!     Ok(Json(service.occupancy(EventId::new(event_id)).await?))
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;

pub use error::AppError;
pub use extractors::{BearerToken, CorrelationId, ValidatedJson};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer, register_http_metrics};
