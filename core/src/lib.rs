//! # Portal Core
//!
//! Enrollment transaction engine for the teacher benefit portal.
//!
//! Teachers enroll in capacity-limited events, optionally bring guests and declare
//! accessibility needs. This crate owns the rules that turn such a request into one
//! consistent state change:
//!
//! - **Capacity Ledger** ([`capacity`]): total/remaining seats of an event
//! - **Guest Quota Subledger** ([`guests`]): guests attached to one enrollment
//! - **Accessibility profile** ([`accessibility`]): a teacher's declared needs, replaced wholesale
//! - **Enrollment state machine** ([`enrollment`]): `Enrolled → Cancelled`, nothing else
//! - **Transaction coordinator** ([`service`]): every multi-row write runs in one transaction
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           EnrollmentService             │  ← begin / commit / rollback
//! ├─────────────────────────────────────────┤
//! │  CapacityLedger  GuestQuota  Profile    │  ← pure decisions, no I/O
//! ├─────────────────────────────────────────┤
//! │   EnrollmentStore / EnrollmentTransaction │  ← PostgreSQL or in-memory
//! └─────────────────────────────────────────┘
//! ```
//!
//! Storage is injected through the [`store::EnrollmentStore`] trait. Production uses
//! `portal-postgres`, tests use the in-memory store from `portal-testing`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod accessibility;
pub mod capacity;
pub mod enrollment;
pub mod environment;
pub mod error;
pub mod guests;
pub mod metrics;
pub mod policy;
pub mod service;
pub mod store;
pub mod types;

pub use accessibility::TeacherAccessibilityProfile;
pub use capacity::CapacityLedger;
pub use enrollment::{CancelTransition, Enrollment, EnrollmentStatus};
pub use environment::{Clock, SystemClock};
pub use error::{EnrollmentError, ErrorKind, StoreError};
pub use guests::{GuestCounts, GuestQuota};
pub use policy::{EnrollmentPolicy, RowScope};
pub use service::{
    CancelTarget, CancellationReceipt, EnrollmentReceipt, EnrollmentRequest, EnrollmentService,
    EnrollmentStatusView, GuestAdditionReceipt, OccupancyReport,
};
pub use store::{EnrollmentStore, EnrollmentTransaction};
pub use types::*;
