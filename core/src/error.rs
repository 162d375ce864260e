//! Error types for the enrollment engine.

use crate::types::{EnrollmentId, EventId, TeacherId};
use thiserror::Error;

/// Errors raised by a storage backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Database connection or query failure.
    #[error("Database error: {0}")]
    Database(String),

    /// A stored value could not be mapped onto the domain model.
    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    /// A write violated a storage-level constraint.
    #[error("Constraint violated: {0}")]
    Constraint(String),
}

/// Caller-facing error categories.
///
/// Every [`EnrollmentError`] belongs to exactly one kind; the HTTP layer maps kinds
/// onto status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Referenced event, teacher, enrollment or status row does not exist.
    NotFound,
    /// Duplicate enrollment for an existing (teacher, event) pair.
    Conflict,
    /// No seats remain.
    CapacityExceeded,
    /// Requested guests exceed the event's per-teacher maximum.
    QuotaExceeded,
    /// Malformed, tampered or expired identity token.
    InvalidToken,
    /// Malformed request payload.
    Validation,
    /// Unexpected storage failure.
    Internal,
}

/// Errors returned by [`crate::EnrollmentService`].
///
/// None of these leave partial state behind: the surrounding transaction is rolled
/// back before the error reaches the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentError {
    /// Event does not exist.
    #[error("event {0} not found")]
    EventNotFound(EventId),

    /// Teacher does not exist.
    #[error("teacher {0} not found")]
    TeacherNotFound(TeacherId),

    /// No teacher is registered under the given national ID.
    #[error("no teacher is registered with national ID {0}")]
    UnknownNationalId(String),

    /// Enrollment does not exist (or belongs to another teacher).
    #[error("enrollment not found")]
    EnrollmentNotFound,

    /// The reference-status catalog lacks a required status row.
    #[error("status '{0}' is not configured")]
    StatusNotConfigured(&'static str),

    /// The teacher already has an enrollment row for this event.
    #[error("teacher {teacher_id} is already enrolled in event {event_id}")]
    AlreadyEnrolled {
        /// Teacher
        teacher_id: TeacherId,
        /// Event
        event_id: EventId,
        /// The existing enrollment
        enrollment_id: EnrollmentId,
    },

    /// All seats of the event are taken.
    #[error("event {event_id} is full: all {total_seats} seat(s) are taken")]
    CapacityExceeded {
        /// Event
        event_id: EventId,
        /// Total seats of the event
        total_seats: u32,
    },

    /// The event does not accept guests.
    #[error("event {0} does not allow guests")]
    GuestsNotAllowed(EventId),

    /// More guests were requested than the quota leaves room for.
    #[error(
        "only {remaining} guest slot(s) remaining (maximum {max} per teacher), {requested} requested"
    )]
    GuestQuotaExceeded {
        /// Guests requested by the caller
        requested: usize,
        /// Free guest slots
        remaining: u32,
        /// Per-teacher maximum
        max: u32,
    },

    /// Guests can only be added to an active enrollment.
    #[error("teacher {teacher_id} has no active enrollment in event {event_id}")]
    NotEnrolled {
        /// Teacher
        teacher_id: TeacherId,
        /// Event
        event_id: EventId,
    },

    /// Malformed request payload.
    #[error("{0}")]
    Validation(String),

    /// Storage backend failure.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl EnrollmentError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// The caller-facing category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EventNotFound(_)
            | Self::TeacherNotFound(_)
            | Self::UnknownNationalId(_)
            | Self::EnrollmentNotFound
            | Self::StatusNotConfigured(_) => ErrorKind::NotFound,
            Self::AlreadyEnrolled { .. } => ErrorKind::Conflict,
            Self::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            Self::GuestsNotAllowed(_) | Self::GuestQuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            Self::NotEnrolled { .. } | Self::Validation(_) => ErrorKind::Validation,
            Self::Storage(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_message_names_remaining_slots() {
        let err = EnrollmentError::GuestQuotaExceeded {
            requested: 2,
            remaining: 1,
            max: 1,
        };
        assert_eq!(
            err.to_string(),
            "only 1 guest slot(s) remaining (maximum 1 per teacher), 2 requested"
        );
        assert_eq!(err.kind(), ErrorKind::QuotaExceeded);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            EnrollmentError::StatusNotConfigured("Cancelled").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            EnrollmentError::AlreadyEnrolled {
                teacher_id: TeacherId::new(1),
                event_id: EventId::new(2),
                enrollment_id: EnrollmentId::new(3),
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            EnrollmentError::Storage(StoreError::Database("down".into())).kind(),
            ErrorKind::Internal
        );
    }
}
