//! Enrollment service: the transaction coordinator.
//!
//! Every operation that writes more than one of {enrollment, guest, accessibility,
//! capacity} runs inside a single [`EnrollmentTransaction`]:
//!
//! ```text
//! begin ─▶ lock event ─▶ checks ─▶ writes ─▶ commit
//!                          │          │
//!                          └──── any error ───▶ rollback
//! ```
//!
//! A failing step never leaves partial state behind: the transaction is rolled back
//! explicitly, and a transaction dropped on any other exit path rolls back as well.

use crate::accessibility::{self, TeacherAccessibilityProfile};
use crate::capacity::CapacityLedger;
use crate::enrollment::{CancelTransition, Enrollment, EnrollmentStatus};
use crate::environment::Clock;
use crate::error::{EnrollmentError, StoreError};
use crate::guests::{GuestCounts, GuestQuota, validate_guests};
use crate::metrics;
use crate::policy::{EnrollmentPolicy, RowScope};
use crate::store::{EnrollmentStore, EnrollmentTransaction};
use crate::types::{
    AccessibilityCategoryId, EnrollmentId, EventId, Guest, NewEnrollment, NewGuest, Teacher,
    TeacherId,
};
use serde::Serialize;
use std::sync::Arc;

// ============================================================================
// Requests and receipts
// ============================================================================

/// A teacher's request to enroll in an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentRequest {
    /// Enrolling teacher
    pub teacher_id: TeacherId,
    /// Target event
    pub event_id: EventId,
    /// Declared accessibility categories (empty = no needs declared)
    pub accessibility: Vec<AccessibilityCategoryId>,
    /// Guests to bring (may be empty)
    pub guests: Vec<NewGuest>,
}

/// Result of a successful enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentReceipt {
    /// New enrollment
    pub enrollment_id: EnrollmentId,
    /// Remaining seats after the reservation
    pub remaining_seats: u32,
    /// Guests attached
    pub guest_count: u32,
    /// Accessibility associations written
    pub accessibility_written: usize,
}

/// Which enrollment a cancellation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelTarget {
    /// A specific enrollment of the caller.
    Enrollment(EnrollmentId),
    /// The caller's enrollment in an event.
    Event(EventId),
}

/// Result of a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancellationReceipt {
    /// Cancelled enrollment
    pub enrollment_id: EnrollmentId,
    /// Event of the enrollment
    pub event_id: EventId,
    /// Remaining seats after the cancellation
    pub remaining_seats: u32,
    /// Whether this request cancelled the enrollment or found it already cancelled
    pub transition: CancelTransition,
}

/// Result of adding guests to an enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuestAdditionReceipt {
    /// Enrollment the guests were attached to
    pub enrollment_id: EnrollmentId,
    /// Counters after the addition
    pub counts: GuestCounts,
}

/// Read-only view of a teacher's enrollment in an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentStatusView {
    /// Most recent enrollment row, if any
    pub enrollment: Option<Enrollment>,
    /// Guest counters of that enrollment
    pub guests: Option<GuestCounts>,
    /// Whether the "add guest" action should be offered
    pub can_add_more_guests: bool,
}

impl EnrollmentStatusView {
    /// Whether the teacher currently holds a seat.
    #[must_use]
    pub fn is_enrolled(&self) -> bool {
        self.enrollment.as_ref().is_some_and(Enrollment::is_active)
    }
}

/// Occupancy of one event, for administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupancyReport {
    /// Event
    pub event_id: EventId,
    /// Event name
    pub name: String,
    /// Total seats
    pub total_seats: u32,
    /// Remaining seats
    pub remaining_seats: u32,
    /// Enrollments with status `Enrolled`
    pub active_enrollments: u32,
    /// Enrollments with status `Cancelled`
    pub cancelled_enrollments: u32,
    /// Guests allowed per teacher
    pub max_guests_per_teacher: u32,
}

// ============================================================================
// Service
// ============================================================================

/// Coordinates enrollment, cancellation and guest transactions.
///
/// Cheap to clone; share one instance across request handlers.
#[derive(Clone)]
pub struct EnrollmentService {
    store: Arc<dyn EnrollmentStore>,
    clock: Arc<dyn Clock>,
    policy: EnrollmentPolicy,
}

impl EnrollmentService {
    /// Create a service with the default policy.
    #[must_use]
    pub fn new(store: Arc<dyn EnrollmentStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            policy: EnrollmentPolicy::default(),
        }
    }

    /// Replace the enrollment policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: EnrollmentPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Active policy.
    #[must_use]
    pub const fn policy(&self) -> EnrollmentPolicy {
        self.policy
    }

    /// Check that the store answers.
    ///
    /// # Errors
    ///
    /// Returns the store's error if it is unreachable.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }

    /// Enroll a teacher in an event.
    ///
    /// In one transaction: creates the enrollment, replaces the teacher's accessibility
    /// associations, attaches the guests and persists the recomputed remaining seats.
    ///
    /// # Errors
    ///
    /// - `Validation`: malformed guest data
    /// - `EventNotFound` / `TeacherNotFound` / `StatusNotConfigured`
    /// - `AlreadyEnrolled`: a row exists for the pair (within the exclusivity scope)
    /// - `CapacityExceeded`: no seat left
    /// - `GuestsNotAllowed` / `GuestQuotaExceeded`
    /// - `Storage`: the transaction failed and was rolled back
    pub async fn enroll(
        &self,
        request: EnrollmentRequest,
    ) -> Result<EnrollmentReceipt, EnrollmentError> {
        let result = self.try_enroll(&request).await;
        metrics::record_enrollment(result.as_ref().map(|_| ()));
        result
    }

    async fn try_enroll(
        &self,
        request: &EnrollmentRequest,
    ) -> Result<EnrollmentReceipt, EnrollmentError> {
        validate_guests(&request.guests)?;

        let mut tx = self.store.begin().await?;
        let outcome = self.enroll_within(tx.as_mut(), request).await;
        let receipt = finish("enroll", tx, outcome).await?;

        tracing::info!(
            teacher_id = %request.teacher_id,
            event_id = %request.event_id,
            enrollment_id = %receipt.enrollment_id,
            remaining_seats = receipt.remaining_seats,
            guest_count = receipt.guest_count,
            "Teacher enrolled"
        );
        Ok(receipt)
    }

    async fn enroll_within(
        &self,
        tx: &mut dyn EnrollmentTransaction,
        request: &EnrollmentRequest,
    ) -> Result<EnrollmentReceipt, EnrollmentError> {
        let event = tx
            .lock_event(request.event_id)
            .await?
            .ok_or(EnrollmentError::EventNotFound(request.event_id))?;
        let teacher = tx
            .find_teacher(request.teacher_id)
            .await?
            .ok_or(EnrollmentError::TeacherNotFound(request.teacher_id))?;
        require_status(tx, EnrollmentStatus::Enrolled).await?;

        if let Some(existing) = tx
            .latest_enrollment(teacher.id, event.id, self.policy.exclusivity)
            .await?
        {
            return Err(EnrollmentError::AlreadyEnrolled {
                teacher_id: teacher.id,
                event_id: event.id,
                enrollment_id: existing.id,
            });
        }

        let occupied = tx.count_enrollments(event.id, self.policy.occupancy).await?;
        let remaining_seats = CapacityLedger::for_event(&event).reserve(occupied)?;

        GuestQuota::for_event(&event).check_initial(request.guests.len())?;
        let guest_count = u32::try_from(request.guests.len())
            .map_err(|_| EnrollmentError::validation("too many guests"))?;

        let enrollment = tx
            .insert_enrollment(NewEnrollment {
                teacher_id: teacher.id,
                event_id: event.id,
                guest_count,
                created_at: self.clock.now(),
            })
            .await?;

        let profile =
            TeacherAccessibilityProfile::declared(teacher.id, request.accessibility.iter().copied());
        let accessibility_written = accessibility::replace_all(tx, &profile).await?;

        if !request.guests.is_empty() {
            tx.insert_guests(enrollment.id, &request.guests).await?;
        }

        tx.set_remaining_seats(event.id, remaining_seats).await?;

        Ok(EnrollmentReceipt {
            enrollment_id: enrollment.id,
            remaining_seats,
            guest_count,
            accessibility_written,
        })
    }

    /// Cancel a teacher's enrollment and release its seat.
    ///
    /// Cancelling an already-cancelled enrollment succeeds without writing anything.
    /// Guests and accessibility associations are kept.
    ///
    /// # Errors
    ///
    /// - `EnrollmentNotFound`: no such enrollment for this teacher
    /// - `StatusNotConfigured`: the catalog lacks the `Cancelled` status
    /// - `Storage`: the transaction failed and was rolled back
    pub async fn cancel(
        &self,
        teacher_id: TeacherId,
        target: CancelTarget,
    ) -> Result<CancellationReceipt, EnrollmentError> {
        let mut tx = self.store.begin().await?;
        let outcome = Self::cancel_within(tx.as_mut(), teacher_id, target).await;
        let result = finish("cancel", tx, outcome).await;

        match &result {
            Ok(receipt) if receipt.transition == CancelTransition::Cancelled => {
                metrics::record_cancellation("cancelled");
                tracing::info!(
                    teacher_id = %teacher_id,
                    enrollment_id = %receipt.enrollment_id,
                    remaining_seats = receipt.remaining_seats,
                    "Enrollment cancelled"
                );
            }
            Ok(receipt) => {
                metrics::record_cancellation("already_cancelled");
                tracing::debug!(
                    enrollment_id = %receipt.enrollment_id,
                    "Enrollment was already cancelled"
                );
            }
            Err(_) => metrics::record_cancellation("rejected"),
        }
        result
    }

    async fn cancel_within(
        tx: &mut dyn EnrollmentTransaction,
        teacher_id: TeacherId,
        target: CancelTarget,
    ) -> Result<CancellationReceipt, EnrollmentError> {
        let found = match target {
            CancelTarget::Enrollment(enrollment_id) => tx
                .find_enrollment(enrollment_id)
                .await?
                .filter(|enrollment| enrollment.teacher_id == teacher_id),
            CancelTarget::Event(event_id) => {
                tx.latest_enrollment(teacher_id, event_id, RowScope::AllStatuses)
                    .await?
            }
        }
        .ok_or(EnrollmentError::EnrollmentNotFound)?;

        let event = tx
            .lock_event(found.event_id)
            .await?
            .ok_or(EnrollmentError::EventNotFound(found.event_id))?;

        // Re-read under the event lock: a concurrent cancellation may have committed.
        let mut enrollment = tx
            .find_enrollment(found.id)
            .await?
            .ok_or(EnrollmentError::EnrollmentNotFound)?;

        if !enrollment.is_active() {
            return Ok(CancellationReceipt {
                enrollment_id: enrollment.id,
                event_id: event.id,
                remaining_seats: event.remaining_seats,
                transition: CancelTransition::AlreadyCancelled,
            });
        }

        require_status(tx, EnrollmentStatus::Cancelled).await?;

        let transition = enrollment.cancel();
        tx.set_enrollment_status(enrollment.id, enrollment.status)
            .await?;

        let remaining_seats = CapacityLedger::for_event(&event).release();
        tx.set_remaining_seats(event.id, remaining_seats).await?;

        Ok(CancellationReceipt {
            enrollment_id: enrollment.id,
            event_id: event.id,
            remaining_seats,
            transition,
        })
    }

    /// Attach more guests to a teacher's active enrollment.
    ///
    /// # Errors
    ///
    /// - `Validation`: empty or malformed guest list
    /// - `EventNotFound`
    /// - `NotEnrolled`: no active enrollment for the pair
    /// - `GuestsNotAllowed` / `GuestQuotaExceeded`
    /// - `Storage`: the transaction failed and was rolled back
    pub async fn add_guests(
        &self,
        teacher_id: TeacherId,
        event_id: EventId,
        guests: Vec<NewGuest>,
    ) -> Result<GuestAdditionReceipt, EnrollmentError> {
        if guests.is_empty() {
            return Err(EnrollmentError::validation("at least one guest is required"));
        }
        validate_guests(&guests)?;

        let mut tx = self.store.begin().await?;
        let outcome = Self::add_guests_within(tx.as_mut(), teacher_id, event_id, &guests).await;
        let receipt = finish("add_guests", tx, outcome).await?;

        metrics::record_guests_added(guests.len());
        tracing::info!(
            teacher_id = %teacher_id,
            event_id = %event_id,
            added = guests.len(),
            current = receipt.counts.current,
            "Guests added"
        );
        Ok(receipt)
    }

    async fn add_guests_within(
        tx: &mut dyn EnrollmentTransaction,
        teacher_id: TeacherId,
        event_id: EventId,
        guests: &[NewGuest],
    ) -> Result<GuestAdditionReceipt, EnrollmentError> {
        let event = tx
            .lock_event(event_id)
            .await?
            .ok_or(EnrollmentError::EventNotFound(event_id))?;
        let enrollment = tx
            .latest_enrollment(teacher_id, event_id, RowScope::ActiveOnly)
            .await?
            .filter(Enrollment::is_active)
            .ok_or(EnrollmentError::NotEnrolled {
                teacher_id,
                event_id,
            })?;

        let quota = GuestQuota::for_event(&event);
        let current = tx.count_guests(enrollment.id).await?;
        let total = quota.check_additional(current, guests.len())?;

        tx.insert_guests(enrollment.id, guests).await?;
        tx.set_guest_count(enrollment.id, total).await?;

        Ok(GuestAdditionReceipt {
            enrollment_id: enrollment.id,
            counts: GuestCounts::new(quota, total),
        })
    }

    /// Whether a teacher is enrolled in an event, with guest counters.
    ///
    /// # Errors
    ///
    /// - `EventNotFound`
    /// - `Storage`
    pub async fn enrollment_status(
        &self,
        teacher_id: TeacherId,
        event_id: EventId,
    ) -> Result<EnrollmentStatusView, EnrollmentError> {
        let mut tx = self.store.begin().await?;
        let outcome = Self::status_within(tx.as_mut(), teacher_id, event_id).await;
        finish_read(tx, outcome).await
    }

    async fn status_within(
        tx: &mut dyn EnrollmentTransaction,
        teacher_id: TeacherId,
        event_id: EventId,
    ) -> Result<EnrollmentStatusView, EnrollmentError> {
        let event = tx
            .find_event(event_id)
            .await?
            .ok_or(EnrollmentError::EventNotFound(event_id))?;
        let Some(enrollment) = tx
            .latest_enrollment(teacher_id, event_id, RowScope::AllStatuses)
            .await?
        else {
            return Ok(EnrollmentStatusView {
                enrollment: None,
                guests: None,
                can_add_more_guests: false,
            });
        };

        let current = tx.count_guests(enrollment.id).await?;
        let counts = GuestCounts::new(GuestQuota::for_event(&event), current);
        let can_add_more_guests = enrollment.is_active() && counts.remaining > 0;

        Ok(EnrollmentStatusView {
            enrollment: Some(enrollment),
            guests: Some(counts),
            can_add_more_guests,
        })
    }

    /// Replace a teacher's accessibility associations outside of an enrollment.
    ///
    /// Returns the number of associations written.
    ///
    /// # Errors
    ///
    /// - `TeacherNotFound`
    /// - `Storage`
    pub async fn replace_accessibility(
        &self,
        teacher_id: TeacherId,
        categories: Vec<AccessibilityCategoryId>,
    ) -> Result<usize, EnrollmentError> {
        let mut tx = self.store.begin().await?;
        let outcome = async {
            tx.find_teacher(teacher_id)
                .await?
                .ok_or(EnrollmentError::TeacherNotFound(teacher_id))?;
            let profile = TeacherAccessibilityProfile::declared(teacher_id, categories);
            Ok(accessibility::replace_all(tx.as_mut(), &profile).await?)
        }
        .await;
        finish("replace_accessibility", tx, outcome).await
    }

    /// A teacher's current accessibility associations.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the read fails.
    pub async fn accessibility_for(
        &self,
        teacher_id: TeacherId,
    ) -> Result<Vec<AccessibilityCategoryId>, EnrollmentError> {
        let mut tx = self.store.begin().await?;
        let outcome = accessibility::list_for(tx.as_mut(), teacher_id)
            .await
            .map_err(EnrollmentError::from);
        finish_read(tx, outcome).await
    }

    /// Guests of a teacher's most recent enrollment in an event.
    ///
    /// # Errors
    ///
    /// - `EnrollmentNotFound`: the teacher never enrolled in the event
    /// - `Storage`
    pub async fn guests_for(
        &self,
        teacher_id: TeacherId,
        event_id: EventId,
    ) -> Result<Vec<Guest>, EnrollmentError> {
        let mut tx = self.store.begin().await?;
        let outcome = async {
            let enrollment = tx
                .latest_enrollment(teacher_id, event_id, RowScope::AllStatuses)
                .await?
                .ok_or(EnrollmentError::EnrollmentNotFound)?;
            Ok(tx.list_guests(enrollment.id).await?)
        }
        .await;
        finish_read(tx, outcome).await
    }

    /// Every enrollment of a teacher, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the read fails.
    pub async fn enrollments_for_teacher(
        &self,
        teacher_id: TeacherId,
    ) -> Result<Vec<Enrollment>, EnrollmentError> {
        let mut tx = self.store.begin().await?;
        let outcome = tx
            .enrollments_for_teacher(teacher_id)
            .await
            .map_err(EnrollmentError::from);
        finish_read(tx, outcome).await
    }

    /// Seat occupancy of an event.
    ///
    /// # Errors
    ///
    /// - `EventNotFound`
    /// - `Storage`
    pub async fn occupancy(&self, event_id: EventId) -> Result<OccupancyReport, EnrollmentError> {
        let mut tx = self.store.begin().await?;
        let outcome = async {
            let event = tx
                .find_event(event_id)
                .await?
                .ok_or(EnrollmentError::EventNotFound(event_id))?;
            let active = tx.count_enrollments(event_id, RowScope::ActiveOnly).await?;
            let all = tx.count_enrollments(event_id, RowScope::AllStatuses).await?;
            Ok(OccupancyReport {
                event_id,
                name: event.name,
                total_seats: event.total_seats,
                remaining_seats: event.remaining_seats,
                active_enrollments: active,
                cancelled_enrollments: all.saturating_sub(active),
                max_guests_per_teacher: event.max_guests_per_teacher,
            })
        }
        .await;
        finish_read(tx, outcome).await
    }

    /// Resolve a teacher by id.
    ///
    /// # Errors
    ///
    /// - `TeacherNotFound`
    /// - `Storage`
    pub async fn teacher(&self, teacher_id: TeacherId) -> Result<Teacher, EnrollmentError> {
        let mut tx = self.store.begin().await?;
        let outcome = async {
            tx.find_teacher(teacher_id)
                .await?
                .ok_or(EnrollmentError::TeacherNotFound(teacher_id))
        }
        .await;
        finish_read(tx, outcome).await
    }

    /// Resolve a teacher by national ID.
    ///
    /// # Errors
    ///
    /// - `Validation`: blank national ID
    /// - `UnknownNationalId`
    /// - `Storage`
    pub async fn teacher_by_national_id(
        &self,
        national_id: &str,
    ) -> Result<Teacher, EnrollmentError> {
        let national_id = national_id.trim();
        if national_id.is_empty() {
            return Err(EnrollmentError::validation("nationalId is required"));
        }

        let mut tx = self.store.begin().await?;
        let outcome = async {
            tx.find_teacher_by_national_id(national_id)
                .await?
                .ok_or_else(|| EnrollmentError::UnknownNationalId(national_id.to_string()))
        }
        .await;
        finish_read(tx, outcome).await
    }
}

/// Fail unless the reference-status catalog has the row for `status`.
async fn require_status(
    tx: &mut dyn EnrollmentTransaction,
    status: EnrollmentStatus,
) -> Result<(), EnrollmentError> {
    tx.find_status(status)
        .await?
        .map(|_| ())
        .ok_or(EnrollmentError::StatusNotConfigured(status.catalog_name()))
}

/// Commit on success, roll back on failure.
async fn finish<T>(
    operation: &'static str,
    tx: Box<dyn EnrollmentTransaction>,
    outcome: Result<T, EnrollmentError>,
) -> Result<T, EnrollmentError> {
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(operation, error = %rollback_err, "Rollback failed");
            }
            metrics::record_rollback(operation);
            if matches!(err, EnrollmentError::Storage(_)) {
                tracing::error!(operation, error = %err, "Transaction rolled back");
            } else {
                tracing::warn!(operation, error = %err, "Transaction rolled back");
            }
            Err(err)
        }
    }
}

/// End a read-only transaction.
async fn finish_read<T>(
    tx: Box<dyn EnrollmentTransaction>,
    outcome: Result<T, EnrollmentError>,
) -> Result<T, EnrollmentError> {
    if let Err(err) = tx.rollback().await {
        tracing::warn!(error = %err, "Failed to close read transaction");
    }
    outcome
}
