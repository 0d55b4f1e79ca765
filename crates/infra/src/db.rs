//! Database adapters (connection pool).

use std::time::Duration;

pub use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::error::{StoreError, map_sqlx_error};

/// Connect to Postgres. The schema is managed outside this service
/// (see `schema/crm.sql`).
pub async fn connect(database_url: &str) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
        .map_err(|e| map_sqlx_error("connect", e))
}
