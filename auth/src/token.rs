//! Identity token issuance and verification.

use crate::error::{Result, TokenError};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Duration;
use hmac::{Hmac, Mac};
use portal_core::{Clock, TeacherId};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

/// Default token lifetime in seconds (24 hours).
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 24 * 60 * 60;

const ALGORITHM: &str = "HS256";
const TOKEN_TYPE: &str = "DOC";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// The verified identity carried by a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherIdentity {
    /// Teacher id
    pub teacher_id: TeacherId,
    /// Teacher national ID
    pub national_id: String,
    /// Issuance, Unix seconds
    pub issued_at: i64,
    /// Expiry, Unix seconds
    pub expires_at: i64,
}

/// Issues and verifies identity tokens with one process-wide secret.
#[derive(Clone)]
pub struct IdentityTokenAuthenticator {
    secret: Arc<[u8]>,
    lifetime: Duration,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for IdentityTokenAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityTokenAuthenticator")
            .field("secret", &"<redacted>")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl IdentityTokenAuthenticator {
    /// Create an authenticator with the default 24 hour lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::EmptySecret`] if `secret` is empty.
    pub fn new(secret: impl Into<Vec<u8>>, clock: Arc<dyn Clock>) -> Result<Self> {
        let secret: Vec<u8> = secret.into();
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }
        Ok(Self {
            secret: secret.into(),
            lifetime: Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS),
            clock,
        })
    }

    /// Override the token lifetime.
    #[must_use]
    pub const fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Token lifetime.
    #[must_use]
    pub const fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issue a token for a teacher.
    ///
    /// # Errors
    ///
    /// - [`TokenError::LifetimeOverflow`] if the expiry cannot be represented
    /// - [`TokenError::Encoding`] if the header or payload cannot be serialized
    pub fn issue(&self, teacher_id: TeacherId, national_id: &str) -> Result<String> {
        let now = self.clock.now();
        let expires_at = now
            .checked_add_signed(self.lifetime)
            .ok_or(TokenError::LifetimeOverflow)?;
        let identity = TeacherIdentity {
            teacher_id,
            national_id: national_id.to_string(),
            issued_at: now.timestamp(),
            expires_at: expires_at.timestamp(),
        };

        let header = encode_segment(&Header {
            alg: ALGORITHM.to_string(),
            typ: TOKEN_TYPE.to_string(),
        })?;
        let payload = encode_segment(&identity)?;
        let signing_input = format!("{header}.{payload}");
        let signature = URL_SAFE_NO_PAD.encode(self.mac(&signing_input)?.finalize().into_bytes());

        tracing::debug!(
            teacher_id = %teacher_id,
            expires_at = identity.expires_at,
            "Issued identity token"
        );
        Ok(format!("{signing_input}.{signature}"))
    }

    /// Verify a token and return the identity it carries.
    ///
    /// The signature is checked before anything in the payload is trusted.
    ///
    /// # Errors
    ///
    /// - [`TokenError::Malformed`]: not three base64url segments, or undecodable JSON
    /// - [`TokenError::BadSignature`]: signature mismatch
    /// - [`TokenError::UnsupportedAlgorithm`]: header algorithm is not HS256
    /// - [`TokenError::Expired`]: `expiresAt` is in the past
    pub fn verify(&self, token: &str) -> Result<TeacherIdentity> {
        let mut segments = token.trim().split('.');
        let (Some(header), Some(payload), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(TokenError::Malformed("expected three segments"));
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed("signature is not base64url"))?;
        self.mac(&format!("{header}.{payload}"))?
            .verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let header: Header = decode_segment(header, "header")?;
        if header.alg != ALGORITHM {
            return Err(TokenError::UnsupportedAlgorithm(header.alg));
        }

        let identity: TeacherIdentity = decode_segment(payload, "payload")?;
        if identity.expires_at < self.clock.now().timestamp() {
            return Err(TokenError::Expired {
                expired_at: identity.expires_at,
            });
        }
        Ok(identity)
    }

    fn mac(&self, signing_input: &str) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|_| TokenError::EmptySecret)?;
        mac.update(signing_input.as_bytes());
        Ok(mac)
    }
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_vec(value).map_err(|e| TokenError::Encoding(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str, what: &'static str) -> Result<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed(what))?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed(what))
}
