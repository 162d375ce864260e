//! Capacity Ledger: total and remaining seats of one event.
//!
//! The ledger makes decisions only; the service persists them while holding the event
//! lock, so a check and the write it justifies cannot interleave with another request.
//!
//! ```text
//! reserve:  occupied < total  →  remaining = total - (occupied + 1)
//! release:  remaining = min(remaining + 1, total)
//! ```

use crate::error::EnrollmentError;
use crate::types::{Event, EventId};

/// Seat bookkeeping for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityLedger {
    event_id: EventId,
    total_seats: u32,
    remaining_seats: u32,
}

impl CapacityLedger {
    /// Ledger view of an event row.
    #[must_use]
    pub const fn for_event(event: &Event) -> Self {
        Self {
            event_id: event.id,
            total_seats: event.total_seats,
            remaining_seats: event.remaining_seats,
        }
    }

    /// Whether one more seat can be taken given `occupied` rows.
    #[must_use]
    pub const fn has_room(&self, occupied: u32) -> bool {
        occupied < self.total_seats
    }

    /// Reserve one seat.
    ///
    /// Returns the remaining-seat count to persist after the reservation.
    ///
    /// # Errors
    ///
    /// Returns [`EnrollmentError::CapacityExceeded`] when `occupied >= total_seats`.
    pub fn reserve(&self, occupied: u32) -> Result<u32, EnrollmentError> {
        if !self.has_room(occupied) {
            return Err(EnrollmentError::CapacityExceeded {
                event_id: self.event_id,
                total_seats: self.total_seats,
            });
        }
        Ok(self.total_seats - (occupied + 1))
    }

    /// Release one seat, never exceeding the total.
    ///
    /// Returns the remaining-seat count to persist.
    #[must_use]
    pub const fn release(&self) -> u32 {
        let released = self.remaining_seats.saturating_add(1);
        if released > self.total_seats {
            self.total_seats
        } else {
            released
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn event(total: u32, remaining: u32) -> Event {
        Event {
            id: EventId::new(1),
            name: "Ceramics".to_string(),
            total_seats: total,
            remaining_seats: remaining,
            max_guests_per_teacher: 0,
        }
    }

    #[test]
    fn test_reserve_recomputes_from_occupancy() {
        let ledger = CapacityLedger::for_event(&event(2, 2));
        assert_eq!(ledger.reserve(0), Ok(1));
        assert_eq!(ledger.reserve(1), Ok(0));
    }

    #[test]
    fn test_reserve_rejects_full_event() {
        let ledger = CapacityLedger::for_event(&event(2, 0));
        assert_eq!(
            ledger.reserve(2),
            Err(EnrollmentError::CapacityExceeded {
                event_id: EventId::new(1),
                total_seats: 2,
            })
        );
    }

    #[test]
    fn test_zero_seat_event_is_always_full() {
        let ledger = CapacityLedger::for_event(&event(0, 0));
        assert!(ledger.reserve(0).is_err());
        assert_eq!(ledger.release(), 0);
    }

    #[test]
    fn test_release_is_clamped() {
        assert_eq!(CapacityLedger::for_event(&event(2, 0)).release(), 1);
        assert_eq!(CapacityLedger::for_event(&event(2, 2)).release(), 2);
    }

    proptest! {
        #[test]
        fn prop_reserve_stays_within_bounds(total in 0u32..500, occupied in 0u32..600) {
            let ledger = CapacityLedger::for_event(&event(total, total));
            if let Ok(remaining) = ledger.reserve(occupied) {
                prop_assert!(remaining < total);
                prop_assert!(occupied < total);
            } else {
                prop_assert!(occupied >= total);
            }
        }

        #[test]
        fn prop_release_never_exceeds_total(total in 0u32..500, remaining in 0u32..500) {
            let remaining = remaining.min(total);
            let ledger = CapacityLedger::for_event(&event(total, remaining));
            prop_assert!(ledger.release() <= total);
            prop_assert!(ledger.release() >= remaining);
        }
    }
}
