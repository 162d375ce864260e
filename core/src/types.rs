//! Domain types for the enrollment engine.
//!
//! Entities reference each other by id only (an [`crate::Enrollment`] stores an
//! [`EventId`] and a [`TeacherId`], never the rows themselves). Every boundary resolves
//! ids through an explicit store lookup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            #[doc = concat!("Wrap a raw database key as a `", stringify!($name), "`")]
            #[must_use]
            pub const fn new(raw: $inner) -> Self {
                Self(raw)
            }

            /// Get the raw database key
            #[must_use]
            pub const fn get(self) -> $inner {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

row_id!(
    /// Identifier of an event (class or activity)
    EventId(i64)
);
row_id!(
    /// Identifier of a teacher
    TeacherId(i64)
);
row_id!(
    /// Identifier of an enrollment
    EnrollmentId(i64)
);
row_id!(
    /// Identifier of a guest row
    GuestId(i64)
);
row_id!(
    /// Identifier of a reference-status catalog row
    StatusId(i64)
);
row_id!(
    /// Identifier of an accessibility/disability catalog category
    AccessibilityCategoryId(i32)
);

// ============================================================================
// Entities
// ============================================================================

/// A capacity-limited event teachers can enroll in.
///
/// Created by administrators outside this crate. The engine only mutates
/// `remaining_seats`, always through the capacity ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event id
    pub id: EventId,
    /// Display name
    pub name: String,
    /// Total seat count
    pub total_seats: u32,
    /// Remaining seat count (`0 <= remaining_seats <= total_seats`)
    pub remaining_seats: u32,
    /// Maximum guests each enrolled teacher may bring (0 = guests not allowed)
    pub max_guests_per_teacher: u32,
}

/// A program participant, identified by a unique national ID.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    /// Teacher id
    pub id: TeacherId,
    /// National identification number (unique)
    pub national_id: String,
    /// Full display name
    pub full_name: String,
    /// Contact e-mail, if on file
    pub email: Option<String>,
}

/// A guest attached to one enrollment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guest {
    /// Guest row id
    pub id: GuestId,
    /// Owning enrollment
    pub enrollment_id: EnrollmentId,
    /// Guest national ID
    pub national_id: String,
    /// Guest display name
    pub name: String,
}

/// Guest data supplied by a caller, not yet persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGuest {
    /// Guest national ID
    pub national_id: String,
    /// Guest display name
    pub name: String,
}

impl NewGuest {
    /// Create guest data, trimming surrounding whitespace.
    #[must_use]
    pub fn new(national_id: impl AsRef<str>, name: impl AsRef<str>) -> Self {
        Self {
            national_id: national_id.as_ref().trim().to_string(),
            name: name.as_ref().trim().to_string(),
        }
    }
}

/// Classification of enrollment rows in the reference-status catalog.
pub const ENROLLMENT_STATUS_CLASSIFICATION: &str = "enrollment";

/// A row of the reference-status catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceStatus {
    /// Catalog id
    pub id: StatusId,
    /// Status name (e.g. `Enrolled`)
    pub name: String,
    /// Classification the status belongs to (e.g. `enrollment`)
    pub classification: String,
}

/// Enrollment data written by the engine when a teacher enrolls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewEnrollment {
    /// Enrolling teacher
    pub teacher_id: TeacherId,
    /// Target event
    pub event_id: EventId,
    /// Initial cached guest count
    pub guest_count: u32,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_display_raw_value() {
        assert_eq!(EventId::new(42).to_string(), "42");
        assert_eq!(AccessibilityCategoryId::new(3).get(), 3);
    }

    #[test]
    fn test_new_guest_trims_input() {
        let guest = NewGuest::new("  12345 ", " Ana Pérez\n");
        assert_eq!(guest.national_id, "12345");
        assert_eq!(guest.name, "Ana Pérez");
    }
}
