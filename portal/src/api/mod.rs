//! HTTP API handlers.

pub mod enrollments;
pub mod events;
pub mod teachers;
