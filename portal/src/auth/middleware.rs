//! Authentication extractor for identity-token protected routes.
//!
//! ```ignore
//! async fn protected(AuthenticatedTeacher(identity): AuthenticatedTeacher) -> String {
//!     format!("Hello, teacher {}", identity.teacher_id)
//! }
//! ```

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use portal_auth::{IdentityTokenAuthenticator, TeacherIdentity};
use portal_web::{AppError, BearerToken};

/// The teacher proven by a valid `Authorization: Bearer <identity token>` header.
///
/// Rejects with 401 when the header is missing or the token is malformed, tampered
/// with or expired.
#[derive(Debug, Clone)]
pub struct AuthenticatedTeacher(pub TeacherIdentity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedTeacher
where
    IdentityTokenAuthenticator: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let authenticator = IdentityTokenAuthenticator::from_ref(state);

        let identity = authenticator.verify(&token)?;
        tracing::debug!(teacher_id = %identity.teacher_id, "Identity token verified");

        Ok(Self(identity))
    }
}
