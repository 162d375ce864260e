//! Storage traits for the enrollment engine.
//!
//! # Design
//!
//! All reads and writes go through an [`EnrollmentTransaction`] obtained from
//! [`EnrollmentStore::begin`]. The service decides *what* to write; a transaction only
//! knows how to read and write rows.
//!
//! - `commit` makes every write of the transaction visible at once
//! - `rollback`, or dropping the transaction without committing, discards every write
//!
//! # Locking
//!
//! [`EnrollmentTransaction::lock_event`] must hold an exclusive lock on the event until the
//! transaction ends. Enrollment, cancellation and guest addition take it first, which
//! serializes the duplicate check, the occupancy count and the seat write per event.
//!
//! # Implementations
//!
//! - `PostgresEnrollmentStore` (in `portal-postgres`): `SELECT ... FOR UPDATE`
//! - `InMemoryEnrollmentStore` (in `portal-testing`): one transaction at a time
//!
//! # Dyn Compatibility
//!
//! Methods return `Pin<Box<dyn Future>>` instead of using `async fn` so the store can be
//! shared as `Arc<dyn EnrollmentStore>` and transactions handed around as
//! `Box<dyn EnrollmentTransaction>`.

use crate::enrollment::{Enrollment, EnrollmentStatus};
use crate::error::StoreError;
use crate::policy::RowScope;
use crate::types::{
    AccessibilityCategoryId, EnrollmentId, Event, EventId, Guest, NewEnrollment, NewGuest,
    ReferenceStatus, Teacher, TeacherId,
};
use std::future::Future;
use std::pin::Pin;

/// Boxed, sendable future returned by storage methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result alias for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Entry point to a storage backend.
pub trait EnrollmentStore: Send + Sync {
    /// Open a transaction.
    ///
    /// # Errors
    ///
    /// Returns error if no connection is available.
    fn begin(&self) -> BoxFuture<'_, StoreResult<Box<dyn EnrollmentTransaction>>>;

    /// Check that the backend answers.
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unreachable.
    fn ping(&self) -> BoxFuture<'_, StoreResult<()>>;
}

/// One atomic unit of work against the store.
pub trait EnrollmentTransaction: Send {
    // ═══════════════════════════════════════════════════════════════════════
    // Events (Capacity Ledger)
    // ═══════════════════════════════════════════════════════════════════════

    /// Read an event without locking it.
    fn find_event(&mut self, event_id: EventId) -> BoxFuture<'_, StoreResult<Option<Event>>>;

    /// Read an event and hold an exclusive lock on it until the transaction ends.
    fn lock_event(&mut self, event_id: EventId) -> BoxFuture<'_, StoreResult<Option<Event>>>;

    /// Persist an event's remaining-seat count.
    fn set_remaining_seats(
        &mut self,
        event_id: EventId,
        remaining_seats: u32,
    ) -> BoxFuture<'_, StoreResult<()>>;

    // ═══════════════════════════════════════════════════════════════════════
    // Collaborator lookups
    // ═══════════════════════════════════════════════════════════════════════

    /// Read a teacher by id.
    fn find_teacher(&mut self, teacher_id: TeacherId)
    -> BoxFuture<'_, StoreResult<Option<Teacher>>>;

    /// Read a teacher by national ID.
    fn find_teacher_by_national_id<'a>(
        &'a mut self,
        national_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<Teacher>>>;

    /// Look up the catalog row for an enrollment status.
    fn find_status(
        &mut self,
        status: EnrollmentStatus,
    ) -> BoxFuture<'_, StoreResult<Option<ReferenceStatus>>>;

    // ═══════════════════════════════════════════════════════════════════════
    // Enrollments
    // ═══════════════════════════════════════════════════════════════════════

    /// Read an enrollment by id.
    fn find_enrollment(
        &mut self,
        enrollment_id: EnrollmentId,
    ) -> BoxFuture<'_, StoreResult<Option<Enrollment>>>;

    /// Most recent enrollment of a teacher for an event within `scope`.
    fn latest_enrollment(
        &mut self,
        teacher_id: TeacherId,
        event_id: EventId,
        scope: RowScope,
    ) -> BoxFuture<'_, StoreResult<Option<Enrollment>>>;

    /// Number of enrollment rows for an event within `scope`.
    fn count_enrollments(
        &mut self,
        event_id: EventId,
        scope: RowScope,
    ) -> BoxFuture<'_, StoreResult<u32>>;

    /// Insert an enrollment with status `Enrolled`.
    fn insert_enrollment(
        &mut self,
        enrollment: NewEnrollment,
    ) -> BoxFuture<'_, StoreResult<Enrollment>>;

    /// Overwrite an enrollment's status.
    fn set_enrollment_status(
        &mut self,
        enrollment_id: EnrollmentId,
        status: EnrollmentStatus,
    ) -> BoxFuture<'_, StoreResult<()>>;

    /// Overwrite an enrollment's cached guest count.
    fn set_guest_count(
        &mut self,
        enrollment_id: EnrollmentId,
        guest_count: u32,
    ) -> BoxFuture<'_, StoreResult<()>>;

    /// Every enrollment of a teacher, newest first.
    fn enrollments_for_teacher(
        &mut self,
        teacher_id: TeacherId,
    ) -> BoxFuture<'_, StoreResult<Vec<Enrollment>>>;

    // ═══════════════════════════════════════════════════════════════════════
    // Guests
    // ═══════════════════════════════════════════════════════════════════════

    /// Number of guest rows attached to an enrollment.
    fn count_guests(&mut self, enrollment_id: EnrollmentId) -> BoxFuture<'_, StoreResult<u32>>;

    /// Insert guest rows for an enrollment.
    fn insert_guests<'a>(
        &'a mut self,
        enrollment_id: EnrollmentId,
        guests: &'a [NewGuest],
    ) -> BoxFuture<'a, StoreResult<Vec<Guest>>>;

    /// Guest rows of an enrollment, in insertion order.
    fn list_guests(&mut self, enrollment_id: EnrollmentId)
    -> BoxFuture<'_, StoreResult<Vec<Guest>>>;

    // ═══════════════════════════════════════════════════════════════════════
    // Accessibility associations
    // ═══════════════════════════════════════════════════════════════════════

    /// Delete every association of a teacher. Returns the number of rows removed.
    fn delete_accessibility(&mut self, teacher_id: TeacherId) -> BoxFuture<'_, StoreResult<u64>>;

    /// Insert one association.
    fn insert_accessibility(
        &mut self,
        teacher_id: TeacherId,
        category_id: AccessibilityCategoryId,
    ) -> BoxFuture<'_, StoreResult<()>>;

    /// Associations of a teacher.
    fn list_accessibility(
        &mut self,
        teacher_id: TeacherId,
    ) -> BoxFuture<'_, StoreResult<Vec<AccessibilityCategoryId>>>;

    // ═══════════════════════════════════════════════════════════════════════
    // Completion
    // ═══════════════════════════════════════════════════════════════════════

    /// Make every write visible.
    fn commit(self: Box<Self>) -> BoxFuture<'static, StoreResult<()>>;

    /// Discard every write.
    fn rollback(self: Box<Self>) -> BoxFuture<'static, StoreResult<()>>;
}
