//! # Teacher Portal
//!
//! HTTP service around the enrollment engine: teachers enroll in events, bring
//! guests, declare accessibility needs and cancel; identity tokens prove who is
//! calling without a server-side session.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  axum router (portal-web middleware)     │  ← JSON, correlation ids, metrics
//! ├──────────────────────────────────────────┤
//! │  EnrollmentService │ IdentityTokenAuth.  │  ← portal-core / portal-auth
//! ├──────────────────────────────────────────┤
//! │  PostgresEnrollmentStore                 │  ← portal-postgres
//! └──────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod auth;
pub mod config;
pub mod metrics;
pub mod server;

pub use config::{Config, ConfigError};
pub use server::{AppState, build_router};
