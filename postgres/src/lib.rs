//! `PostgreSQL` storage for the teacher benefit portal.
//!
//! This crate implements [`portal_core::EnrollmentStore`] on top of a sqlx connection
//! pool:
//!
//! - every [`portal_core::EnrollmentTransaction`] wraps one database transaction
//! - `lock_event` is `SELECT ... FOR UPDATE` on the event row, which serializes
//!   enrollment, cancellation and guest addition per event
//! - the schema backs the engine's rules with constraints (one active enrollment per
//!   teacher and event, `0 <= remaining_seats <= total_seats`)
//!
//! # Example
//!
//! ```ignore
//! use portal_postgres::{PoolSettings, PostgresEnrollmentStore};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresEnrollmentStore::connect(
//!         "postgres://localhost/portal",
//!         PoolSettings::default(),
//!     )
//!     .await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod rows;
mod store;
mod transaction;

pub use store::{PoolSettings, PostgresEnrollmentStore};
pub use transaction::PgEnrollmentTransaction;
