//! Error types for web handlers.
//!
//! [`AppError`] bridges engine and authenticator errors to HTTP responses. Every
//! rejection carries a machine-readable `code` and a human-readable `message`:
//!
//! ```json
//! { "code": "QUOTA_EXCEEDED", "message": "only 1 guest slot(s) remaining (maximum 2 per teacher), 3 requested" }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use portal_auth::TokenError;
use portal_core::{EnrollmentError, ErrorKind};
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
///
/// Server errors keep their source for logging; the client only ever sees the
/// generic message.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(service): State<EnrollmentService>) -> Result<Json<Teacher>, AppError> {
///     let teacher = service.teacher(id).await?;
///     Ok(Json(teacher))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: &'static str,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: &'static str) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Attach the underlying error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message.into(), "BAD_REQUEST")
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message.into(), "UNAUTHORIZED")
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message.into(), "NOT_FOUND")
    }

    /// Create a 409 Conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message.into(), "CONFLICT")
    }

    /// Create a 409 error for a full event.
    #[must_use]
    pub fn capacity_exceeded(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message.into(), "CAPACITY_EXCEEDED")
    }

    /// Create a 400 error for an exhausted guest quota.
    #[must_use]
    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message.into(), "QUOTA_EXCEEDED")
    }

    /// Create a 422 Unprocessable Entity error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            message.into(),
            "VALIDATION_ERROR",
        )
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR",
        )
    }

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            message.into(),
            "SERVICE_UNAVAILABLE",
        )
    }

    /// HTTP status of the response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    /// User-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse<'a> {
    code: &'a str,
    message: &'a str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: &self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

impl From<EnrollmentError> for AppError {
    fn from(err: EnrollmentError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::NotFound => Self::not_found(message),
            ErrorKind::Conflict => Self::conflict(message),
            ErrorKind::CapacityExceeded => Self::capacity_exceeded(message),
            ErrorKind::QuotaExceeded => Self::quota_exceeded(message),
            ErrorKind::Validation => Self::bad_request(message),
            ErrorKind::InvalidToken => Self::unauthorized(message),
            ErrorKind::Internal => {
                Self::internal("An internal error occurred").with_source(err.into())
            }
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        if err.is_invalid_token() {
            tracing::debug!(error = %err, "Rejected identity token");
            Self::unauthorized("Invalid or expired identity token")
        } else {
            Self::internal("An internal error occurred").with_source(err.into())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use portal_core::{EventId, StoreError, TeacherId};

    #[test]
    fn test_error_display() {
        let err = AppError::bad_request("Invalid input");
        assert_eq!(err.to_string(), "[BAD_REQUEST] Invalid input");
    }

    #[test]
    fn test_validation() {
        let err = AppError::validation("guests is required");
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_enrollment_error_mapping() {
        let cases = [
            (
                EnrollmentError::EventNotFound(EventId::new(1)),
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
            ),
            (
                EnrollmentError::StatusNotConfigured("Cancelled"),
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
            ),
            (
                EnrollmentError::CapacityExceeded {
                    event_id: EventId::new(1),
                    total_seats: 2,
                },
                StatusCode::CONFLICT,
                "CAPACITY_EXCEEDED",
            ),
            (
                EnrollmentError::GuestQuotaExceeded {
                    requested: 2,
                    remaining: 1,
                    max: 1,
                },
                StatusCode::BAD_REQUEST,
                "QUOTA_EXCEEDED",
            ),
            (
                EnrollmentError::NotEnrolled {
                    teacher_id: TeacherId::new(1),
                    event_id: EventId::new(2),
                },
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
            ),
        ];

        for (err, status, code) in cases {
            let app: AppError = err.into();
            assert_eq!(app.status(), status);
            assert_eq!(app.code(), code);
        }
    }

    #[test]
    fn test_quota_message_is_human_readable() {
        let app: AppError = EnrollmentError::GuestQuotaExceeded {
            requested: 3,
            remaining: 1,
            max: 2,
        }
        .into();
        assert!(app.message().starts_with("only 1 guest slot(s) remaining"));
    }

    #[test]
    fn test_storage_error_hides_details() {
        let app: AppError =
            EnrollmentError::Storage(StoreError::Database("password=hunter2".into())).into();
        assert_eq!(app.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!app.message().contains("hunter2"));
        assert!(std::error::Error::source(&app).is_some());
    }

    #[test]
    fn test_token_error_mapping() {
        let app: AppError = TokenError::BadSignature.into();
        assert_eq!(app.status(), StatusCode::UNAUTHORIZED);

        let app: AppError = TokenError::EmptySecret.into();
        assert_eq!(app.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_response_body() {
        let response = AppError::conflict("already enrolled").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "CONFLICT");
        assert_eq!(body["message"], "already enrolled");
    }
}
