//! Identity endpoints and the authenticated-teacher extractor.

pub mod handlers;
pub mod middleware;

pub use middleware::AuthenticatedTeacher;
