//! Row mapping between `PostgreSQL` and the domain model.

use chrono::{DateTime, Utc};
use portal_core::{
    Enrollment, EnrollmentId, EnrollmentStatus, Event, EventId, Guest, GuestId, StoreError,
    Teacher, TeacherId,
};

pub(crate) type EventRow = (i64, String, i32, i32, i32);
pub(crate) type TeacherRow = (i64, String, String, Option<String>);
pub(crate) type EnrollmentRow = (i64, i64, i64, String, i32, DateTime<Utc>);
pub(crate) type GuestRow = (i64, i64, String, String);

pub(crate) const EVENT_COLUMNS: &str =
    "id, name, total_seats, remaining_seats, max_guests_per_teacher";
pub(crate) const TEACHER_COLUMNS: &str = "id, national_id, full_name, email";
pub(crate) const ENROLLMENT_COLUMNS: &str =
    "id, teacher_id, event_id, status, guest_count, created_at";

/// Map a sqlx error, separating constraint violations from other failures.
pub(crate) fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> StoreError {
    move |e| match &e {
        sqlx::Error::Database(db)
            if db.is_unique_violation()
                || db.is_check_violation()
                || db.is_foreign_key_violation() =>
        {
            StoreError::Constraint(format!("{context}: {db}"))
        }
        _ => StoreError::Database(format!("{context}: {e}")),
    }
}

pub(crate) fn to_u32(value: i32, column: &str) -> Result<u32, StoreError> {
    u32::try_from(value)
        .map_err(|_| StoreError::CorruptRow(format!("{column} is negative: {value}")))
}

pub(crate) fn count_to_u32(value: i64) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::CorruptRow(format!("count out of range: {value}")))
}

pub(crate) fn to_i32(value: u32, column: &str) -> Result<i32, StoreError> {
    i32::try_from(value)
        .map_err(|_| StoreError::Constraint(format!("{column} exceeds i32::MAX: {value}")))
}

pub(crate) fn event(row: EventRow) -> Result<Event, StoreError> {
    let (id, name, total_seats, remaining_seats, max_guests) = row;
    Ok(Event {
        id: EventId::new(id),
        name,
        total_seats: to_u32(total_seats, "total_seats")?,
        remaining_seats: to_u32(remaining_seats, "remaining_seats")?,
        max_guests_per_teacher: to_u32(max_guests, "max_guests_per_teacher")?,
    })
}

pub(crate) fn teacher(row: TeacherRow) -> Teacher {
    let (id, national_id, full_name, email) = row;
    Teacher {
        id: TeacherId::new(id),
        national_id,
        full_name,
        email,
    }
}

pub(crate) fn enrollment(row: EnrollmentRow) -> Result<Enrollment, StoreError> {
    let (id, teacher_id, event_id, status, guest_count, created_at) = row;
    let status = EnrollmentStatus::parse(&status)
        .ok_or_else(|| StoreError::CorruptRow(format!("unknown enrollment status '{status}'")))?;
    Ok(Enrollment {
        id: EnrollmentId::new(id),
        teacher_id: TeacherId::new(teacher_id),
        event_id: EventId::new(event_id),
        status,
        guest_count: to_u32(guest_count, "guest_count")?,
        created_at,
    })
}

pub(crate) fn guest(row: GuestRow) -> Guest {
    let (id, enrollment_id, national_id, name) = row;
    Guest {
        id: GuestId::new(id),
        enrollment_id: EnrollmentId::new(enrollment_id),
        national_id,
        name,
    }
}
