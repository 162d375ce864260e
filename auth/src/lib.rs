//! # Portal Auth
//!
//! Stateless identity tokens for the teacher benefit portal.
//!
//! A token binds a teacher's id and national ID to a request without any server-side
//! session state:
//!
//! ```text
//! base64url(header) . base64url(payload) . base64url(HMAC-SHA256(secret, "header.payload"))
//! ```
//!
//! - header: `{"alg":"HS256","typ":"DOC"}`
//! - payload: `{"teacherId", "nationalId", "issuedAt", "expiresAt"}` (Unix seconds)
//! - lifetime: 24 hours by default
//!
//! Verification fails closed: any malformed segment, signature mismatch or expiry is
//! reported as a [`TokenError`], never a panic.
//!
//! ## Example
//!
//! ```
//! use portal_auth::IdentityTokenAuthenticator;
//! use portal_core::{SystemClock, TeacherId};
//! use std::sync::Arc;
//!
//! let auth = IdentityTokenAuthenticator::new(b"secret".to_vec(), Arc::new(SystemClock)).unwrap();
//! let token = auth.issue(TeacherId::new(7), "1234567890").unwrap();
//! let identity = auth.verify(&token).unwrap();
//! assert_eq!(identity.teacher_id, TeacherId::new(7));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod token;

pub use error::TokenError;
pub use token::{DEFAULT_TOKEN_LIFETIME_SECS, IdentityTokenAuthenticator, TeacherIdentity};
