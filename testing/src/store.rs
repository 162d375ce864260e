//! In-memory enrollment store.
//!
//! A transaction takes the store-wide lock for its whole lifetime and works on a copy
//! of the state; `commit` swaps the copy in, anything else throws it away. Transactions
//! therefore run one at a time, which is a stronger guarantee than the per-event lock
//! the trait requires.
//!
//! The store enforces the same constraints as the database schema (one active
//! enrollment per teacher and event, `remaining_seats <= total_seats`, one row per
//! teacher and accessibility category), and can be told to fail a chosen step to
//! exercise rollback paths.

use portal_core::store::{BoxFuture, StoreResult};
use portal_core::{
    AccessibilityCategoryId, Enrollment, EnrollmentId, EnrollmentStatus, EnrollmentStore,
    EnrollmentTransaction, Event, EventId, Guest, GuestId, NewEnrollment, NewGuest,
    ReferenceStatus, RowScope, StatusId, StoreError, Teacher, TeacherId,
    ENROLLMENT_STATUS_CLASSIFICATION,
};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A step that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    /// `insert_enrollment`
    InsertEnrollment,
    /// `insert_guests`
    InsertGuests,
    /// `insert_accessibility`
    InsertAccessibility,
    /// `set_remaining_seats`
    SetRemainingSeats,
    /// `set_enrollment_status`
    SetEnrollmentStatus,
    /// `set_guest_count`
    SetGuestCount,
    /// `commit`
    Commit,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    events: BTreeMap<EventId, Event>,
    teachers: BTreeMap<TeacherId, Teacher>,
    statuses: Vec<ReferenceStatus>,
    enrollments: BTreeMap<EnrollmentId, Enrollment>,
    guests: Vec<Guest>,
    accessibility: BTreeSet<(TeacherId, AccessibilityCategoryId)>,
    next_enrollment_id: i64,
    next_guest_id: i64,
}

impl Tables {
    fn with_status_catalog() -> Self {
        let statuses = [EnrollmentStatus::Enrolled, EnrollmentStatus::Cancelled]
            .into_iter()
            .zip(1..)
            .map(|(status, id)| ReferenceStatus {
                id: StatusId::new(id),
                name: status.catalog_name().to_string(),
                classification: ENROLLMENT_STATUS_CLASSIFICATION.to_string(),
            })
            .collect();
        Self {
            statuses,
            next_enrollment_id: 1,
            next_guest_id: 1,
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    tables: Tables,
    fail_points: HashSet<FailPoint>,
    commits: usize,
    rollbacks: usize,
}

/// In-memory [`EnrollmentStore`] for tests.
///
/// Clones share the same state.
#[derive(Debug, Clone)]
pub struct InMemoryEnrollmentStore {
    shared: Arc<Mutex<Shared>>,
}

impl Default for InMemoryEnrollmentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEnrollmentStore {
    /// Empty store whose status catalog holds `Enrolled` and `Cancelled`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                tables: Tables::with_status_catalog(),
                ..Shared::default()
            })),
        }
    }

    /// Insert or replace an event.
    pub async fn add_event(&self, event: Event) {
        self.shared.lock().await.tables.events.insert(event.id, event);
    }

    /// Insert or replace a teacher.
    pub async fn add_teacher(&self, teacher: Teacher) {
        self.shared
            .lock()
            .await
            .tables
            .teachers
            .insert(teacher.id, teacher);
    }

    /// Remove a status from the catalog.
    pub async fn remove_status(&self, status: EnrollmentStatus) {
        self.shared
            .lock()
            .await
            .tables
            .statuses
            .retain(|row| row.name != status.catalog_name());
    }

    /// Make every later execution of `point` fail.
    pub async fn fail_on(&self, point: FailPoint) {
        self.shared.lock().await.fail_points.insert(point);
    }

    /// Stop failing `point`.
    pub async fn clear_failure(&self, point: FailPoint) {
        self.shared.lock().await.fail_points.remove(&point);
    }

    /// Committed state of an event.
    pub async fn event(&self, event_id: EventId) -> Option<Event> {
        self.shared.lock().await.tables.events.get(&event_id).cloned()
    }

    /// Every committed enrollment, by id.
    pub async fn enrollments(&self) -> Vec<Enrollment> {
        self.shared
            .lock()
            .await
            .tables
            .enrollments
            .values()
            .cloned()
            .collect()
    }

    /// Committed guests of an enrollment.
    pub async fn guests(&self, enrollment_id: EnrollmentId) -> Vec<Guest> {
        self.shared
            .lock()
            .await
            .tables
            .guests
            .iter()
            .filter(|guest| guest.enrollment_id == enrollment_id)
            .cloned()
            .collect()
    }

    /// Every committed guest row.
    pub async fn guest_rows(&self) -> usize {
        self.shared.lock().await.tables.guests.len()
    }

    /// Committed accessibility associations of a teacher.
    pub async fn accessibility(&self, teacher_id: TeacherId) -> Vec<AccessibilityCategoryId> {
        self.shared
            .lock()
            .await
            .tables
            .accessibility
            .iter()
            .filter(|(owner, _)| *owner == teacher_id)
            .map(|(_, category)| *category)
            .collect()
    }

    /// Number of committed transactions.
    pub async fn commits(&self) -> usize {
        self.shared.lock().await.commits
    }

    /// Number of explicitly rolled-back transactions.
    pub async fn rollbacks(&self) -> usize {
        self.shared.lock().await.rollbacks
    }
}

impl EnrollmentStore for InMemoryEnrollmentStore {
    fn begin(&self) -> BoxFuture<'_, StoreResult<Box<dyn EnrollmentTransaction>>> {
        Box::pin(async move {
            let guard = Arc::clone(&self.shared).lock_owned().await;
            let working = guard.tables.clone();
            Ok(Box::new(InMemoryTransaction { guard, working }) as Box<dyn EnrollmentTransaction>)
        })
    }

    fn ping(&self) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

struct InMemoryTransaction {
    guard: OwnedMutexGuard<Shared>,
    working: Tables,
}

impl InMemoryTransaction {
    fn check(&self, point: FailPoint) -> StoreResult<()> {
        if self.guard.fail_points.contains(&point) {
            return Err(StoreError::Database(format!("injected failure at {point:?}")));
        }
        Ok(())
    }

    fn latest(
        &self,
        teacher_id: TeacherId,
        event_id: EventId,
        scope: RowScope,
    ) -> Option<Enrollment> {
        self.working
            .enrollments
            .values()
            .rev()
            .find(|row| {
                row.teacher_id == teacher_id
                    && row.event_id == event_id
                    && in_scope(row, scope)
            })
            .cloned()
    }

    fn enrollment_mut(&mut self, enrollment_id: EnrollmentId) -> StoreResult<&mut Enrollment> {
        self.working
            .enrollments
            .get_mut(&enrollment_id)
            .ok_or_else(|| StoreError::Database(format!("enrollment {enrollment_id} not found")))
    }
}

fn in_scope(row: &Enrollment, scope: RowScope) -> bool {
    match scope {
        RowScope::AllStatuses => true,
        RowScope::ActiveOnly => row.is_active(),
    }
}

impl EnrollmentTransaction for InMemoryTransaction {
    fn find_event(&mut self, event_id: EventId) -> BoxFuture<'_, StoreResult<Option<Event>>> {
        Box::pin(async move { Ok(self.working.events.get(&event_id).cloned()) })
    }

    fn lock_event(&mut self, event_id: EventId) -> BoxFuture<'_, StoreResult<Option<Event>>> {
        // The whole store is already locked by this transaction.
        self.find_event(event_id)
    }

    fn set_remaining_seats(
        &mut self,
        event_id: EventId,
        remaining_seats: u32,
    ) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            self.check(FailPoint::SetRemainingSeats)?;
            let event = self
                .working
                .events
                .get_mut(&event_id)
                .ok_or_else(|| StoreError::Database(format!("event {event_id} not found")))?;
            if remaining_seats > event.total_seats {
                return Err(StoreError::Constraint(format!(
                    "remaining_seats {remaining_seats} exceeds total_seats {}",
                    event.total_seats
                )));
            }
            event.remaining_seats = remaining_seats;
            Ok(())
        })
    }

    fn find_teacher(
        &mut self,
        teacher_id: TeacherId,
    ) -> BoxFuture<'_, StoreResult<Option<Teacher>>> {
        Box::pin(async move { Ok(self.working.teachers.get(&teacher_id).cloned()) })
    }

    fn find_teacher_by_national_id<'a>(
        &'a mut self,
        national_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<Teacher>>> {
        Box::pin(async move {
            Ok(self
                .working
                .teachers
                .values()
                .find(|teacher| teacher.national_id == national_id)
                .cloned())
        })
    }

    fn find_status(
        &mut self,
        status: EnrollmentStatus,
    ) -> BoxFuture<'_, StoreResult<Option<ReferenceStatus>>> {
        Box::pin(async move {
            Ok(self
                .working
                .statuses
                .iter()
                .find(|row| {
                    row.name == status.catalog_name()
                        && row.classification == ENROLLMENT_STATUS_CLASSIFICATION
                })
                .cloned())
        })
    }

    fn find_enrollment(
        &mut self,
        enrollment_id: EnrollmentId,
    ) -> BoxFuture<'_, StoreResult<Option<Enrollment>>> {
        Box::pin(async move { Ok(self.working.enrollments.get(&enrollment_id).cloned()) })
    }

    fn latest_enrollment(
        &mut self,
        teacher_id: TeacherId,
        event_id: EventId,
        scope: RowScope,
    ) -> BoxFuture<'_, StoreResult<Option<Enrollment>>> {
        Box::pin(async move { Ok(self.latest(teacher_id, event_id, scope)) })
    }

    fn count_enrollments(
        &mut self,
        event_id: EventId,
        scope: RowScope,
    ) -> BoxFuture<'_, StoreResult<u32>> {
        Box::pin(async move {
            let count = self
                .working
                .enrollments
                .values()
                .filter(|row| row.event_id == event_id && in_scope(row, scope))
                .count();
            u32::try_from(count).map_err(|e| StoreError::CorruptRow(e.to_string()))
        })
    }

    fn insert_enrollment(
        &mut self,
        enrollment: NewEnrollment,
    ) -> BoxFuture<'_, StoreResult<Enrollment>> {
        Box::pin(async move {
            self.check(FailPoint::InsertEnrollment)?;
            if self
                .latest(enrollment.teacher_id, enrollment.event_id, RowScope::ActiveOnly)
                .is_some()
            {
                return Err(StoreError::Constraint(
                    "duplicate active enrollment for teacher and event".to_string(),
                ));
            }
            let id = EnrollmentId::new(self.working.next_enrollment_id);
            self.working.next_enrollment_id += 1;
            let row = Enrollment {
                id,
                teacher_id: enrollment.teacher_id,
                event_id: enrollment.event_id,
                status: EnrollmentStatus::Enrolled,
                guest_count: enrollment.guest_count,
                created_at: enrollment.created_at,
            };
            self.working.enrollments.insert(id, row.clone());
            Ok(row)
        })
    }

    fn set_enrollment_status(
        &mut self,
        enrollment_id: EnrollmentId,
        status: EnrollmentStatus,
    ) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            self.check(FailPoint::SetEnrollmentStatus)?;
            self.enrollment_mut(enrollment_id)?.status = status;
            Ok(())
        })
    }

    fn set_guest_count(
        &mut self,
        enrollment_id: EnrollmentId,
        guest_count: u32,
    ) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            self.check(FailPoint::SetGuestCount)?;
            self.enrollment_mut(enrollment_id)?.guest_count = guest_count;
            Ok(())
        })
    }

    fn enrollments_for_teacher(
        &mut self,
        teacher_id: TeacherId,
    ) -> BoxFuture<'_, StoreResult<Vec<Enrollment>>> {
        Box::pin(async move {
            Ok(self
                .working
                .enrollments
                .values()
                .rev()
                .filter(|row| row.teacher_id == teacher_id)
                .cloned()
                .collect())
        })
    }

    fn count_guests(&mut self, enrollment_id: EnrollmentId) -> BoxFuture<'_, StoreResult<u32>> {
        Box::pin(async move {
            let count = self
                .working
                .guests
                .iter()
                .filter(|guest| guest.enrollment_id == enrollment_id)
                .count();
            u32::try_from(count).map_err(|e| StoreError::CorruptRow(e.to_string()))
        })
    }

    fn insert_guests<'a>(
        &'a mut self,
        enrollment_id: EnrollmentId,
        guests: &'a [NewGuest],
    ) -> BoxFuture<'a, StoreResult<Vec<Guest>>> {
        Box::pin(async move {
            self.check(FailPoint::InsertGuests)?;
            let mut inserted = Vec::with_capacity(guests.len());
            for guest in guests {
                let row = Guest {
                    id: GuestId::new(self.working.next_guest_id),
                    enrollment_id,
                    national_id: guest.national_id.clone(),
                    name: guest.name.clone(),
                };
                self.working.next_guest_id += 1;
                self.working.guests.push(row.clone());
                inserted.push(row);
            }
            Ok(inserted)
        })
    }

    fn list_guests(
        &mut self,
        enrollment_id: EnrollmentId,
    ) -> BoxFuture<'_, StoreResult<Vec<Guest>>> {
        Box::pin(async move {
            Ok(self
                .working
                .guests
                .iter()
                .filter(|guest| guest.enrollment_id == enrollment_id)
                .cloned()
                .collect())
        })
    }

    fn delete_accessibility(&mut self, teacher_id: TeacherId) -> BoxFuture<'_, StoreResult<u64>> {
        Box::pin(async move {
            let before = self.working.accessibility.len();
            self.working
                .accessibility
                .retain(|(owner, _)| *owner != teacher_id);
            Ok((before - self.working.accessibility.len()) as u64)
        })
    }

    fn insert_accessibility(
        &mut self,
        teacher_id: TeacherId,
        category_id: AccessibilityCategoryId,
    ) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            self.check(FailPoint::InsertAccessibility)?;
            if !self.working.accessibility.insert((teacher_id, category_id)) {
                return Err(StoreError::Constraint(format!(
                    "teacher {teacher_id} already has category {category_id}"
                )));
            }
            Ok(())
        })
    }

    fn list_accessibility(
        &mut self,
        teacher_id: TeacherId,
    ) -> BoxFuture<'_, StoreResult<Vec<AccessibilityCategoryId>>> {
        Box::pin(async move {
            Ok(self
                .working
                .accessibility
                .iter()
                .filter(|(owner, _)| *owner == teacher_id)
                .map(|(_, category)| *category)
                .collect())
        })
    }

    fn commit(self: Box<Self>) -> BoxFuture<'static, StoreResult<()>> {
        Box::pin(async move {
            let Self { mut guard, working } = *self;
            if guard.fail_points.contains(&FailPoint::Commit) {
                return Err(StoreError::Database("injected failure at Commit".to_string()));
            }
            guard.tables = working;
            guard.commits += 1;
            Ok(())
        })
    }

    fn rollback(self: Box<Self>) -> BoxFuture<'static, StoreResult<()>> {
        Box::pin(async move {
            let mut guard = self.guard;
            guard.rollbacks += 1;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::fixtures;

    #[tokio::test]
    async fn test_uncommitted_writes_are_discarded() {
        let store = InMemoryEnrollmentStore::new();
        store.add_event(fixtures::event(1, 5, 0)).await;

        let mut tx = store.begin().await.unwrap();
        tx.set_remaining_seats(EventId::new(1), 2).await.unwrap();
        drop(tx);

        assert_eq!(store.event(EventId::new(1)).await.unwrap().remaining_seats, 5);
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let store = InMemoryEnrollmentStore::new();
        store.add_event(fixtures::event(1, 5, 0)).await;

        let mut tx = store.begin().await.unwrap();
        tx.set_remaining_seats(EventId::new(1), 2).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.event(EventId::new(1)).await.unwrap().remaining_seats, 2);
        assert_eq!(store.commits().await, 1);
    }

    #[tokio::test]
    async fn test_remaining_seats_cannot_exceed_total() {
        let store = InMemoryEnrollmentStore::new();
        store.add_event(fixtures::event(1, 5, 0)).await;

        let mut tx = store.begin().await.unwrap();
        let err = tx.set_remaining_seats(EventId::new(1), 6).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[tokio::test]
    async fn test_fail_point() {
        let store = InMemoryEnrollmentStore::new();
        store.add_event(fixtures::event(1, 5, 0)).await;
        store.fail_on(FailPoint::SetRemainingSeats).await;

        let mut tx = store.begin().await.unwrap();
        assert!(tx.set_remaining_seats(EventId::new(1), 2).await.is_err());
        tx.rollback().await.unwrap();

        store.clear_failure(FailPoint::SetRemainingSeats).await;
        let mut tx = store.begin().await.unwrap();
        assert!(tx.set_remaining_seats(EventId::new(1), 2).await.is_ok());
        drop(tx);

        assert_eq!(store.rollbacks().await, 1);
        assert_eq!(store.commits().await, 0);
    }

    #[tokio::test]
    async fn test_status_catalog_is_seeded() {
        let store = InMemoryEnrollmentStore::new();
        store.remove_status(EnrollmentStatus::Cancelled).await;

        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_status(EnrollmentStatus::Enrolled).await.unwrap().is_some());
        assert!(tx.find_status(EnrollmentStatus::Cancelled).await.unwrap().is_none());
    }
}
