//! Connection pool and transaction entry point.

use crate::rows::db_error;
use crate::transaction::PgEnrollmentTransaction;
use portal_core::store::{BoxFuture, StoreResult};
use portal_core::{EnrollmentStore, EnrollmentTransaction, StoreError};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Connection pool settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections in the pool
    pub min_connections: u32,
    /// How long to wait for a connection
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

/// `PostgreSQL` enrollment store.
#[derive(Clone, Debug)]
pub struct PostgresEnrollmentStore {
    pool: PgPool,
}

impl PostgresEnrollmentStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the connection fails.
    pub async fn connect(database_url: &str, settings: PoolSettings) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to connect: {e}")))?;

        tracing::info!(
            max_connections = settings.max_connections,
            "Connected to PostgreSQL"
        );
        Ok(Self::from_pool(pool))
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl EnrollmentStore for PostgresEnrollmentStore {
    fn begin(&self) -> BoxFuture<'_, StoreResult<Box<dyn EnrollmentTransaction>>> {
        Box::pin(async move {
            let tx = self
                .pool
                .begin()
                .await
                .map_err(db_error("Failed to start transaction"))?;
            Ok(Box::new(PgEnrollmentTransaction::new(tx)) as Box<dyn EnrollmentTransaction>)
        })
    }

    fn ping(&self) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(db_error("Health check failed"))?;
            Ok(())
        })
    }
}
