//! Error types for identity token operations.

use thiserror::Error;

/// Result type alias for token operations.
pub type Result<T> = std::result::Result<T, TokenError>;

/// Why a token could not be issued or verified.
///
/// Every verification failure means the same thing to a caller (the token is not
/// valid); the variants exist for logs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    // ═══════════════════════════════════════════════════════════
    // Verification Errors
    // ═══════════════════════════════════════════════════════════
    /// Wrong segment count or undecodable segment.
    #[error("Malformed token: {0}")]
    Malformed(&'static str),

    /// Signature does not match the header and payload.
    #[error("Invalid token signature")]
    BadSignature,

    /// Header names an algorithm other than HS256.
    #[error("Unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// `expiresAt` is in the past.
    #[error("Token expired at {expired_at}")]
    Expired {
        /// Expiry, Unix seconds
        expired_at: i64,
    },

    // ═══════════════════════════════════════════════════════════
    // Configuration Errors
    // ═══════════════════════════════════════════════════════════
    /// The signing secret is empty.
    #[error("Token signing secret must not be empty")]
    EmptySecret,

    /// Header or payload could not be serialized.
    #[error("Token encoding failed: {0}")]
    Encoding(String),

    /// Issuance time plus the configured lifetime is not a representable timestamp.
    #[error("Token lifetime overflows the expiry timestamp")]
    LifetimeOverflow,
}

impl TokenError {
    /// Whether this error is the caller's fault (as opposed to server misconfiguration).
    #[must_use]
    pub const fn is_invalid_token(&self) -> bool {
        matches!(
            self,
            Self::Malformed(_)
                | Self::BadSignature
                | Self::UnsupportedAlgorithm(_)
                | Self::Expired { .. }
        )
    }
}
