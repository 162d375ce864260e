//! Identity token endpoints.
//!
//! Tokens are issued by national ID lookup alone; there is no password.

use crate::auth::AuthenticatedTeacher;
use crate::metrics::record_token_issued;
use axum::{Json, extract::State};
use portal_auth::IdentityTokenAuthenticator;
use portal_core::{EnrollmentService, Teacher, TeacherId};
use portal_web::{AppError, ValidatedJson};
use serde::{Deserialize, Serialize};

/// Teacher data returned by identity endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherSummary {
    /// Teacher id
    pub id: TeacherId,
    /// National ID
    pub national_id: String,
    /// Full name
    pub full_name: String,
    /// E-mail, if on file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl From<Teacher> for TeacherSummary {
    fn from(teacher: Teacher) -> Self {
        Self {
            id: teacher.id,
            national_id: teacher.national_id,
            full_name: teacher.full_name,
            email: teacher.email,
        }
    }
}

/// Request body of `POST /api/identity/token`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTokenRequest {
    /// National ID of the teacher
    pub national_id: String,
}

/// Response of `POST /api/identity/token`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTokenResponse {
    /// Signed identity token
    pub token: String,
    /// Token lifetime in seconds
    pub expires_in: i64,
    /// The identified teacher
    pub teacher: TeacherSummary,
}

/// Issue an identity token for a teacher identified by national ID.
///
/// # Errors
///
/// - 400 if `nationalId` is blank
/// - 404 if no teacher has that national ID
pub async fn issue_identity_token(
    State(service): State<EnrollmentService>,
    State(authenticator): State<IdentityTokenAuthenticator>,
    ValidatedJson(request): ValidatedJson<IssueTokenRequest>,
) -> Result<Json<IssueTokenResponse>, AppError> {
    let teacher = service.teacher_by_national_id(&request.national_id).await?;
    let token = authenticator.issue(teacher.id, &teacher.national_id)?;
    record_token_issued();

    tracing::info!(teacher_id = %teacher.id, "Identity token issued");

    Ok(Json(IssueTokenResponse {
        token,
        expires_in: authenticator.lifetime().num_seconds(),
        teacher: teacher.into(),
    }))
}

/// Response of `GET /api/identity/me`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentIdentityResponse {
    /// The authenticated teacher
    pub teacher: TeacherSummary,
    /// Token issuance, Unix seconds
    pub issued_at: i64,
    /// Token expiry, Unix seconds
    pub expires_at: i64,
}

/// Return the teacher proven by the bearer token.
///
/// # Errors
///
/// - 401 if the token is missing, invalid or expired
/// - 404 if the teacher no longer exists
pub async fn current_identity(
    State(service): State<EnrollmentService>,
    AuthenticatedTeacher(identity): AuthenticatedTeacher,
) -> Result<Json<CurrentIdentityResponse>, AppError> {
    let teacher = service.teacher(identity.teacher_id).await?;

    Ok(Json(CurrentIdentityResponse {
        teacher: teacher.into(),
        issued_at: identity.issued_at,
        expires_at: identity.expires_at,
    }))
}
