//! One enrollment transaction on one database transaction.

use crate::rows::{
    self, ENROLLMENT_COLUMNS, EVENT_COLUMNS, EnrollmentRow, EventRow, GuestRow, TEACHER_COLUMNS,
    TeacherRow, count_to_u32, db_error, to_i32,
};
use portal_core::store::{BoxFuture, StoreResult};
use portal_core::{
    AccessibilityCategoryId, ENROLLMENT_STATUS_CLASSIFICATION, Enrollment, EnrollmentId,
    EnrollmentStatus, EnrollmentTransaction, Event, EventId, Guest, NewEnrollment, NewGuest,
    ReferenceStatus, RowScope, StatusId, Teacher, TeacherId,
};
use sqlx::{Postgres, Transaction};

/// Catalog id of an enrollment status, resolved inside the statement.
const STATUS_ID_BY_NAME: &str =
    "(SELECT id FROM reference_statuses WHERE name = $3 AND classification = 'enrollment')";

const fn scope_filter(scope: RowScope) -> &'static str {
    match scope {
        RowScope::AllStatuses => "",
        RowScope::ActiveOnly => " AND status = 'enrolled'",
    }
}

/// [`EnrollmentTransaction`] backed by a `PostgreSQL` transaction.
///
/// Dropping it without calling `commit` rolls the database transaction back.
pub struct PgEnrollmentTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PgEnrollmentTransaction {
    pub(crate) const fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self { tx }
    }

    async fn fetch_event(&mut self, event_id: EventId, lock: bool) -> StoreResult<Option<Event>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1{}",
            if lock { " FOR UPDATE" } else { "" }
        );
        sqlx::query_as::<_, EventRow>(&sql)
            .bind(event_id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_error("Failed to read event"))?
            .map(rows::event)
            .transpose()
    }
}

impl EnrollmentTransaction for PgEnrollmentTransaction {
    fn find_event(&mut self, event_id: EventId) -> BoxFuture<'_, StoreResult<Option<Event>>> {
        Box::pin(self.fetch_event(event_id, false))
    }

    fn lock_event(&mut self, event_id: EventId) -> BoxFuture<'_, StoreResult<Option<Event>>> {
        Box::pin(async move {
            let event = self.fetch_event(event_id, true).await?;
            tracing::trace!(event_id = %event_id, found = event.is_some(), "Locked event row");
            Ok(event)
        })
    }

    fn set_remaining_seats(
        &mut self,
        event_id: EventId,
        remaining_seats: u32,
    ) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            sqlx::query("UPDATE events SET remaining_seats = $2 WHERE id = $1")
                .bind(event_id.get())
                .bind(to_i32(remaining_seats, "remaining_seats")?)
                .execute(&mut *self.tx)
                .await
                .map_err(db_error("Failed to update remaining seats"))?;
            Ok(())
        })
    }

    fn find_teacher(
        &mut self,
        teacher_id: TeacherId,
    ) -> BoxFuture<'_, StoreResult<Option<Teacher>>> {
        Box::pin(async move {
            let sql = format!("SELECT {TEACHER_COLUMNS} FROM teachers WHERE id = $1");
            let row = sqlx::query_as::<_, TeacherRow>(&sql)
                .bind(teacher_id.get())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(db_error("Failed to read teacher"))?;
            Ok(row.map(rows::teacher))
        })
    }

    fn find_teacher_by_national_id<'a>(
        &'a mut self,
        national_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<Teacher>>> {
        Box::pin(async move {
            let sql = format!("SELECT {TEACHER_COLUMNS} FROM teachers WHERE national_id = $1");
            let row = sqlx::query_as::<_, TeacherRow>(&sql)
                .bind(national_id)
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(db_error("Failed to read teacher"))?;
            Ok(row.map(rows::teacher))
        })
    }

    fn find_status(
        &mut self,
        status: EnrollmentStatus,
    ) -> BoxFuture<'_, StoreResult<Option<ReferenceStatus>>> {
        Box::pin(async move {
            let row = sqlx::query_as::<_, (i64, String, String)>(
                r"
                SELECT id, name, classification
                FROM reference_statuses
                WHERE name = $1 AND classification = $2
                ",
            )
            .bind(status.catalog_name())
            .bind(ENROLLMENT_STATUS_CLASSIFICATION)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_error("Failed to read status catalog"))?;

            Ok(row.map(|(id, name, classification)| ReferenceStatus {
                id: StatusId::new(id),
                name,
                classification,
            }))
        })
    }

    fn find_enrollment(
        &mut self,
        enrollment_id: EnrollmentId,
    ) -> BoxFuture<'_, StoreResult<Option<Enrollment>>> {
        Box::pin(async move {
            let sql = format!("SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE id = $1");
            sqlx::query_as::<_, EnrollmentRow>(&sql)
                .bind(enrollment_id.get())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(db_error("Failed to read enrollment"))?
                .map(rows::enrollment)
                .transpose()
        })
    }

    fn latest_enrollment(
        &mut self,
        teacher_id: TeacherId,
        event_id: EventId,
        scope: RowScope,
    ) -> BoxFuture<'_, StoreResult<Option<Enrollment>>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT {ENROLLMENT_COLUMNS} FROM enrollments \
                 WHERE teacher_id = $1 AND event_id = $2{} \
                 ORDER BY created_at DESC, id DESC LIMIT 1",
                scope_filter(scope)
            );
            sqlx::query_as::<_, EnrollmentRow>(&sql)
                .bind(teacher_id.get())
                .bind(event_id.get())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(db_error("Failed to read enrollment"))?
                .map(rows::enrollment)
                .transpose()
        })
    }

    fn count_enrollments(
        &mut self,
        event_id: EventId,
        scope: RowScope,
    ) -> BoxFuture<'_, StoreResult<u32>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT COUNT(*) FROM enrollments WHERE event_id = $1{}",
                scope_filter(scope)
            );
            let (count,): (i64,) = sqlx::query_as(&sql)
                .bind(event_id.get())
                .fetch_one(&mut *self.tx)
                .await
                .map_err(db_error("Failed to count enrollments"))?;
            count_to_u32(count)
        })
    }

    fn insert_enrollment(
        &mut self,
        enrollment: NewEnrollment,
    ) -> BoxFuture<'_, StoreResult<Enrollment>> {
        Box::pin(async move {
            let status = EnrollmentStatus::Enrolled;
            let sql = format!(
                "INSERT INTO enrollments \
                 (teacher_id, event_id, status, status_id, guest_count, created_at) \
                 VALUES ($1, $2, $4, {STATUS_ID_BY_NAME}, $5, $6) \
                 RETURNING id"
            );
            let (id,): (i64,) = sqlx::query_as(&sql)
                .bind(enrollment.teacher_id.get())
                .bind(enrollment.event_id.get())
                .bind(status.catalog_name())
                .bind(status.as_str())
                .bind(to_i32(enrollment.guest_count, "guest_count")?)
                .bind(enrollment.created_at)
                .fetch_one(&mut *self.tx)
                .await
                .map_err(db_error("Failed to insert enrollment"))?;

            Ok(Enrollment {
                id: EnrollmentId::new(id),
                teacher_id: enrollment.teacher_id,
                event_id: enrollment.event_id,
                status,
                guest_count: enrollment.guest_count,
                created_at: enrollment.created_at,
            })
        })
    }

    fn set_enrollment_status(
        &mut self,
        enrollment_id: EnrollmentId,
        status: EnrollmentStatus,
    ) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let sql = format!(
                "UPDATE enrollments \
                 SET status = $2, status_id = {STATUS_ID_BY_NAME}, updated_at = now() \
                 WHERE id = $1"
            );
            sqlx::query(&sql)
                .bind(enrollment_id.get())
                .bind(status.as_str())
                .bind(status.catalog_name())
                .execute(&mut *self.tx)
                .await
                .map_err(db_error("Failed to update enrollment status"))?;
            Ok(())
        })
    }

    fn set_guest_count(
        &mut self,
        enrollment_id: EnrollmentId,
        guest_count: u32,
    ) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            sqlx::query("UPDATE enrollments SET guest_count = $2, updated_at = now() WHERE id = $1")
                .bind(enrollment_id.get())
                .bind(to_i32(guest_count, "guest_count")?)
                .execute(&mut *self.tx)
                .await
                .map_err(db_error("Failed to update guest count"))?;
            Ok(())
        })
    }

    fn enrollments_for_teacher(
        &mut self,
        teacher_id: TeacherId,
    ) -> BoxFuture<'_, StoreResult<Vec<Enrollment>>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT {ENROLLMENT_COLUMNS} FROM enrollments \
                 WHERE teacher_id = $1 ORDER BY created_at DESC, id DESC"
            );
            sqlx::query_as::<_, EnrollmentRow>(&sql)
                .bind(teacher_id.get())
                .fetch_all(&mut *self.tx)
                .await
                .map_err(db_error("Failed to list enrollments"))?
                .into_iter()
                .map(rows::enrollment)
                .collect()
        })
    }

    fn count_guests(&mut self, enrollment_id: EnrollmentId) -> BoxFuture<'_, StoreResult<u32>> {
        Box::pin(async move {
            let (count,): (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM guests WHERE enrollment_id = $1")
                    .bind(enrollment_id.get())
                    .fetch_one(&mut *self.tx)
                    .await
                    .map_err(db_error("Failed to count guests"))?;
            count_to_u32(count)
        })
    }

    fn insert_guests<'a>(
        &'a mut self,
        enrollment_id: EnrollmentId,
        guests: &'a [NewGuest],
    ) -> BoxFuture<'a, StoreResult<Vec<Guest>>> {
        Box::pin(async move {
            let mut inserted = Vec::with_capacity(guests.len());
            for guest in guests {
                let (id,): (i64,) = sqlx::query_as(
                    "INSERT INTO guests (enrollment_id, national_id, name) VALUES ($1, $2, $3) RETURNING id",
                )
                .bind(enrollment_id.get())
                .bind(&guest.national_id)
                .bind(&guest.name)
                .fetch_one(&mut *self.tx)
                .await
                .map_err(db_error("Failed to insert guest"))?;

                inserted.push(rows::guest((
                    id,
                    enrollment_id.get(),
                    guest.national_id.clone(),
                    guest.name.clone(),
                )));
            }
            Ok(inserted)
        })
    }

    fn list_guests(
        &mut self,
        enrollment_id: EnrollmentId,
    ) -> BoxFuture<'_, StoreResult<Vec<Guest>>> {
        Box::pin(async move {
            let rows = sqlx::query_as::<_, GuestRow>(
                "SELECT id, enrollment_id, national_id, name FROM guests WHERE enrollment_id = $1 ORDER BY id",
            )
            .bind(enrollment_id.get())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db_error("Failed to list guests"))?;
            Ok(rows.into_iter().map(rows::guest).collect())
        })
    }

    fn delete_accessibility(&mut self, teacher_id: TeacherId) -> BoxFuture<'_, StoreResult<u64>> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM teacher_accessibility WHERE teacher_id = $1")
                .bind(teacher_id.get())
                .execute(&mut *self.tx)
                .await
                .map_err(db_error("Failed to delete accessibility associations"))?;
            Ok(result.rows_affected())
        })
    }

    fn insert_accessibility(
        &mut self,
        teacher_id: TeacherId,
        category_id: AccessibilityCategoryId,
    ) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            sqlx::query("INSERT INTO teacher_accessibility (teacher_id, category_id) VALUES ($1, $2)")
                .bind(teacher_id.get())
                .bind(category_id.get())
                .execute(&mut *self.tx)
                .await
                .map_err(db_error("Failed to insert accessibility association"))?;
            Ok(())
        })
    }

    fn list_accessibility(
        &mut self,
        teacher_id: TeacherId,
    ) -> BoxFuture<'_, StoreResult<Vec<AccessibilityCategoryId>>> {
        Box::pin(async move {
            let rows: Vec<(i32,)> = sqlx::query_as(
                "SELECT category_id FROM teacher_accessibility WHERE teacher_id = $1 ORDER BY category_id",
            )
            .bind(teacher_id.get())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db_error("Failed to list accessibility associations"))?;
            Ok(rows
                .into_iter()
                .map(|(id,)| AccessibilityCategoryId::new(id))
                .collect())
        })
    }

    fn commit(self: Box<Self>) -> BoxFuture<'static, StoreResult<()>> {
        Box::pin(async move {
            self.tx
                .commit()
                .await
                .map_err(db_error("Failed to commit transaction"))
        })
    }

    fn rollback(self: Box<Self>) -> BoxFuture<'static, StoreResult<()>> {
        Box::pin(async move {
            self.tx
                .rollback()
                .await
                .map_err(db_error("Failed to roll back transaction"))
        })
    }
}
