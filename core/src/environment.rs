//! Injected environment dependencies.
//!
//! All time-dependent logic (enrollment timestamps, token expiry) reads the time
//! through [`Clock`] so tests can pin it.

use chrono::{DateTime, Utc};

/// Clock trait - abstracts time operations for testability
///
/// # Examples
///
/// ```
/// use portal_core::environment::{Clock, SystemClock};
///
/// let clock = SystemClock;
/// let now = clock.now();
/// assert!(now.timestamp() > 0);
/// ```
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
