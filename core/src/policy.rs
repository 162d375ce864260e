//! Enrollment policies.
//!
//! Two checks read enrollment rows for an event: the "already enrolled" check and the
//! occupancy count feeding the capacity check. Whether cancelled rows take part in
//! either is a policy decision, not a fixed rule.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which enrollment rows a check considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowScope {
    /// Every row, cancelled ones included.
    #[default]
    AllStatuses,
    /// Only rows whose status is `Enrolled`.
    ActiveOnly,
}

impl RowScope {
    /// Configuration spelling of the scope.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AllStatuses => "all_statuses",
            Self::ActiveOnly => "active_only",
        }
    }
}

impl FromStr for RowScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all_statuses" | "all_rows" | "any_status" | "all" => Ok(Self::AllStatuses),
            "active_only" | "active" => Ok(Self::ActiveOnly),
            other => Err(format!(
                "unknown row scope '{other}' (expected 'any_status' or 'active_only')"
            )),
        }
    }
}

/// Policy knobs of the enrollment engine.
///
/// The default reproduces the portal's established behavior: a teacher who cancelled
/// cannot enroll in the same event again, and cancelled rows keep counting toward the
/// occupancy used by the capacity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnrollmentPolicy {
    /// Rows that make a new enrollment a duplicate.
    pub exclusivity: RowScope,
    /// Rows that count as occupied seats.
    pub occupancy: RowScope,
}

impl EnrollmentPolicy {
    /// Policy that lets cancelled teachers enroll again and frees their seat for the
    /// capacity check.
    #[must_use]
    pub const fn allow_reenrollment() -> Self {
        Self {
            exclusivity: RowScope::ActiveOnly,
            occupancy: RowScope::ActiveOnly,
        }
    }
}
