//! Guest Quota Subledger.
//!
//! Guest rows are the source of truth for how many guests an enrollment has; the
//! `guest_count` column on the enrollment is a cached mirror the service rewrites in
//! the same transaction as the guest inserts.

use crate::error::EnrollmentError;
use crate::types::{Event, EventId, NewGuest};
use serde::Serialize;
use std::collections::HashSet;

/// Per-teacher guest allowance of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuestQuota {
    event_id: EventId,
    max_per_teacher: u32,
}

impl GuestQuota {
    /// Quota of an event row.
    #[must_use]
    pub const fn for_event(event: &Event) -> Self {
        Self {
            event_id: event.id,
            max_per_teacher: event.max_guests_per_teacher,
        }
    }

    /// Maximum guests per enrolled teacher.
    #[must_use]
    pub const fn max_per_teacher(&self) -> u32 {
        self.max_per_teacher
    }

    /// Whether the event accepts guests at all.
    #[must_use]
    pub const fn allows_guests(&self) -> bool {
        self.max_per_teacher > 0
    }

    /// Free slots given `current` guests.
    #[must_use]
    pub const fn remaining(&self, current: u32) -> u32 {
        self.max_per_teacher.saturating_sub(current)
    }

    /// Check the guests supplied together with a new enrollment.
    ///
    /// An empty list always passes.
    ///
    /// # Errors
    ///
    /// - [`EnrollmentError::GuestsNotAllowed`] when guests are supplied and the maximum is 0
    /// - [`EnrollmentError::GuestQuotaExceeded`] when more guests than the maximum are supplied
    pub fn check_initial(&self, requested: usize) -> Result<(), EnrollmentError> {
        if requested == 0 {
            return Ok(());
        }
        self.check_additional(0, requested).map(|_| ())
    }

    /// Check adding `requested` guests to an enrollment that already has `current`.
    ///
    /// Returns the new total.
    ///
    /// # Errors
    ///
    /// - [`EnrollmentError::GuestsNotAllowed`] when the maximum is 0
    /// - [`EnrollmentError::GuestQuotaExceeded`] when `requested` exceeds the free slots
    pub fn check_additional(&self, current: u32, requested: usize) -> Result<u32, EnrollmentError> {
        if !self.allows_guests() {
            return Err(EnrollmentError::GuestsNotAllowed(self.event_id));
        }
        let remaining = self.remaining(current);
        match u32::try_from(requested) {
            Ok(requested) if requested <= remaining => Ok(current + requested),
            _ => Err(EnrollmentError::GuestQuotaExceeded {
                requested,
                remaining,
                max: self.max_per_teacher,
            }),
        }
    }
}

/// Guest counters of one enrollment, as shown before offering "add guest".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestCounts {
    /// Guests currently attached
    pub current: u32,
    /// Per-teacher maximum
    pub max: u32,
    /// Free slots
    pub remaining: u32,
}

impl GuestCounts {
    /// Counters for `current` guests under `quota`.
    #[must_use]
    pub const fn new(quota: GuestQuota, current: u32) -> Self {
        Self {
            current,
            max: quota.max_per_teacher(),
            remaining: quota.remaining(current),
        }
    }
}

/// Validate caller-supplied guest data.
///
/// # Errors
///
/// Returns [`EnrollmentError::Validation`] when a national ID or name is blank, or the
/// same national ID appears twice.
pub fn validate_guests(guests: &[NewGuest]) -> Result<(), EnrollmentError> {
    let mut seen = HashSet::with_capacity(guests.len());
    for (index, guest) in guests.iter().enumerate() {
        if guest.national_id.trim().is_empty() {
            return Err(EnrollmentError::validation(format!(
                "guest #{} is missing guestNationalId",
                index + 1
            )));
        }
        if guest.name.trim().is_empty() {
            return Err(EnrollmentError::validation(format!(
                "guest #{} is missing guestName",
                index + 1
            )));
        }
        if !seen.insert(guest.national_id.trim()) {
            return Err(EnrollmentError::validation(format!(
                "guest national ID {} appears more than once",
                guest.national_id.trim()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quota(max: u32) -> GuestQuota {
        GuestQuota::for_event(&Event {
            id: EventId::new(7),
            name: "Museum visit".to_string(),
            total_seats: 10,
            remaining_seats: 10,
            max_guests_per_teacher: max,
        })
    }

    #[test]
    fn test_initial_without_guests_always_passes() {
        assert!(quota(0).check_initial(0).is_ok());
    }

    #[test]
    fn test_initial_guests_on_guestless_event() {
        assert_eq!(
            quota(0).check_initial(1),
            Err(EnrollmentError::GuestsNotAllowed(EventId::new(7)))
        );
    }

    #[test]
    fn test_initial_guests_within_quota() {
        assert_eq!(quota(2).check_initial(2), Ok(()));
        assert_eq!(
            quota(2).check_initial(3),
            Err(EnrollmentError::GuestQuotaExceeded {
                requested: 3,
                remaining: 2,
                max: 2,
            })
        );
    }

    #[test]
    fn test_additional_respects_remaining_slots() {
        assert_eq!(quota(3).check_additional(1, 2), Ok(3));
        assert_eq!(
            quota(1).check_additional(1, 1),
            Err(EnrollmentError::GuestQuotaExceeded {
                requested: 1,
                remaining: 0,
                max: 1,
            })
        );
    }

    #[test]
    fn test_counts() {
        let counts = GuestCounts::new(quota(2), 1);
        assert_eq!(counts.remaining, 1);
        assert_eq!(GuestCounts::new(quota(2), 5).remaining, 0);
    }

    #[test]
    fn test_validate_guests() {
        assert!(validate_guests(&[NewGuest::new("1", "A"), NewGuest::new("2", "B")]).is_ok());
        assert!(validate_guests(&[NewGuest::new(" ", "A")]).is_err());
        assert!(validate_guests(&[NewGuest::new("1", "")]).is_err());
        let duplicated = validate_guests(&[NewGuest::new("1", "A"), NewGuest::new("1", "B")]);
        assert_eq!(
            duplicated,
            Err(EnrollmentError::validation("guest national ID 1 appears more than once"))
        );
    }
}
