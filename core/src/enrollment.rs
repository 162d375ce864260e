//! Enrollment state machine.
//!
//! ```text
//!   (none) ──enroll──▶ Enrolled ──cancel──▶ Cancelled ──cancel──▶ Cancelled (no-op)
//! ```
//!
//! There is no transition out of `Cancelled`. Whether a cancelled teacher may create a
//! *new* enrollment for the same event is decided by [`crate::EnrollmentPolicy`].

use crate::types::{EnrollmentId, EventId, TeacherId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of an enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    /// The teacher holds a seat.
    Enrolled,
    /// The teacher gave the seat back. Terminal.
    Cancelled,
}

impl EnrollmentStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Enrolled => "enrolled",
            Self::Cancelled => "cancelled",
        }
    }

    /// Name of the matching row in the reference-status catalog.
    #[must_use]
    pub const fn catalog_name(&self) -> &'static str {
        match self {
            Self::Enrolled => "Enrolled",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Parse the storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "enrolled" => Some(Self::Enrolled),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of applying a cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelTransition {
    /// `Enrolled → Cancelled`: the seat must be released.
    Cancelled,
    /// Already cancelled: nothing to write, nothing to release.
    AlreadyCancelled,
}

/// The record binding one teacher to one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    /// Enrollment id
    pub id: EnrollmentId,
    /// Enrolled teacher
    pub teacher_id: TeacherId,
    /// Target event
    pub event_id: EventId,
    /// Current status
    pub status: EnrollmentStatus,
    /// Cached guest count, mirrors the guest rows
    pub guest_count: u32,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Enrollment {
    /// Whether the enrollment currently holds a seat.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == EnrollmentStatus::Enrolled
    }

    /// Apply a cancellation to the in-memory record.
    pub fn cancel(&mut self) -> CancelTransition {
        match self.status {
            EnrollmentStatus::Enrolled => {
                self.status = EnrollmentStatus::Cancelled;
                CancelTransition::Cancelled
            }
            EnrollmentStatus::Cancelled => CancelTransition::AlreadyCancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enrollment(status: EnrollmentStatus) -> Enrollment {
        Enrollment {
            id: EnrollmentId::new(1),
            teacher_id: TeacherId::new(2),
            event_id: EventId::new(3),
            status,
            guest_count: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_cancel_enrolled() {
        let mut record = enrollment(EnrollmentStatus::Enrolled);
        assert_eq!(record.cancel(), CancelTransition::Cancelled);
        assert_eq!(record.status, EnrollmentStatus::Cancelled);
        assert!(!record.is_active());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut record = enrollment(EnrollmentStatus::Cancelled);
        assert_eq!(record.cancel(), CancelTransition::AlreadyCancelled);
        assert_eq!(record.cancel(), CancelTransition::AlreadyCancelled);
        assert_eq!(record.status, EnrollmentStatus::Cancelled);
    }

    #[test]
    fn test_status_round_trips_through_storage_names() {
        for status in [EnrollmentStatus::Enrolled, EnrollmentStatus::Cancelled] {
            assert_eq!(EnrollmentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(EnrollmentStatus::parse("pending"), None);
    }
}
