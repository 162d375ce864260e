//! # Portal Testing
//!
//! Test doubles and fixtures for the teacher benefit portal.
//!
//! This crate provides:
//! - [`FixedClock`]: deterministic time
//! - [`InMemoryEnrollmentStore`]: transactional in-memory storage with fault injection
//! - [`fixtures`]: builders for events and teachers
//! - [`properties`]: proptest strategies for guest lists
//!
//! ## Example
//!
//! ```ignore
//! use portal_testing::{InMemoryEnrollmentStore, fixtures, test_clock};
//! use portal_core::EnrollmentService;
//! use std::sync::Arc;
//!
//! #[tokio::test]
//! async fn test_enroll() {
//!     let store = InMemoryEnrollmentStore::new();
//!     store.add_event(fixtures::event(1, 10, 2)).await;
//!     store.add_teacher(fixtures::teacher(7, "1234567890")).await;
//!
//!     let service = EnrollmentService::new(Arc::new(store.clone()), Arc::new(test_clock()));
//!     // ...
//! }
//! ```

mod store;

pub use store::{FailPoint, InMemoryEnrollmentStore};

use chrono::{DateTime, Utc};
use portal_core::environment::Clock;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use portal_testing::mocks::FixedClock;
    /// use portal_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone, Copy)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }

        /// A clock fixed `offset` after this one.
        #[must_use]
        pub fn advanced_by(&self, offset: chrono::Duration) -> Self {
            Self::new(self.time + offset)
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Builders for rows the engine never creates itself.
pub mod fixtures {
    use portal_core::{Event, EventId, NewGuest, Teacher, TeacherId};

    /// An event with every seat free.
    #[must_use]
    pub fn event(id: i64, total_seats: u32, max_guests_per_teacher: u32) -> Event {
        Event {
            id: EventId::new(id),
            name: format!("Event {id}"),
            total_seats,
            remaining_seats: total_seats,
            max_guests_per_teacher,
        }
    }

    /// A teacher named after its id.
    #[must_use]
    pub fn teacher(id: i64, national_id: &str) -> Teacher {
        Teacher {
            id: TeacherId::new(id),
            national_id: national_id.to_string(),
            full_name: format!("Teacher {id}"),
            email: Some(format!("teacher{id}@example.org")),
        }
    }

    /// `count` distinct guests, national IDs starting at `first`.
    #[must_use]
    pub fn guests(first: u32, count: u32) -> Vec<NewGuest> {
        (first..first + count)
            .map(|n| NewGuest::new(format!("G{n:08}"), format!("Guest {n}")))
            .collect()
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use portal_core::NewGuest;
    use proptest::prelude::*;

    /// Lists of up to `max_len` well-formed guests with distinct national IDs.
    pub fn guest_lists(max_len: usize) -> impl Strategy<Value = Vec<NewGuest>> {
        prop::collection::btree_set("[0-9]{6,10}", 0..=max_len).prop_map(|ids| {
            ids.into_iter()
                .enumerate()
                .map(|(n, id)| NewGuest::new(id, format!("Guest {n}")))
                .collect()
        })
    }
}

/// Install a `tracing` subscriber for test output.
///
/// Honors `RUST_LOG`; safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "portal_core=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn test_advanced_clock() {
        let clock = test_clock();
        let later = clock.advanced_by(chrono::Duration::hours(1));
        assert_eq!(later.now() - clock.now(), chrono::Duration::hours(1));
    }

    #[test]
    fn test_fixture_guests_are_distinct() {
        let guests = fixtures::guests(1, 3);
        assert_eq!(guests.len(), 3);
        assert_ne!(guests[0].national_id, guests[1].national_id);
    }
}
