//! HTTP request handlers shared by portal services.

pub mod health;

pub use health::{health_check, readiness_check};
