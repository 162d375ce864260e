//! Custom Axum extractors.
//!
//! - `CorrelationId`: the request's correlation id
//! - `BearerToken`: the raw token of an `Authorization: Bearer ...` header
//! - `ValidatedJson`: a JSON body whose decoding failures become `422 VALIDATION_ERROR`
//!
//! # Examples
//!
//! ```ignore
//! use portal_web::extractors::{BearerToken, CorrelationId, ValidatedJson};
//!
//! async fn handler(
//!     correlation_id: CorrelationId,
//!     token: BearerToken,
//!     ValidatedJson(body): ValidatedJson<CancelBody>,
//! ) -> Result<Json<Response>, AppError> {
//!     tracing::info!(correlation_id = %correlation_id.0, "Processing request");
//!     Ok(Json(response))
//! }
//! ```

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;
use axum::{
    Json, async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts},
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Correlation ID for request tracing.
///
/// Prefers the id stored by [`crate::correlation_id_layer`], then the
/// `X-Correlation-ID` header, and generates a UUID v4 otherwise.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Uuid>() {
            return Ok(Self(*id));
        }

        let correlation_id = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// Bearer token from the `Authorization` header.
///
/// Only extracts the raw string; verification is up to the caller.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?
            .to_str()
            .map_err(|_| AppError::unauthorized("Invalid authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("Authorization header must use Bearer scheme"))?
            .trim();

        if token.is_empty() {
            return Err(AppError::unauthorized("Empty bearer token"));
        }

        Ok(Self(token.to_string()))
    }
}

/// JSON body extractor with a uniform validation rejection.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(AppError::validation(rejection.body_text())),
        }
    }
}
