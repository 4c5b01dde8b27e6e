pub mod appointments;
pub mod business_hours;
pub mod customers;
pub mod notifications;
pub mod policies;
pub mod schema;
pub mod services;
pub mod stylists;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::instrument;

/// Open a pooled connection to the SQLite database named by `database_url`
/// and run the idempotent schema setup.
///
/// Safe to call on every startup — every statement in `schema::init_db` is
/// `CREATE TABLE IF NOT EXISTS` / `CREATE INDEX IF NOT EXISTS`.
#[instrument(skip(database_url))]
pub async fn connect(database_url: &str) -> salon_core::Result<SqlitePool> {
    let opts = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| salon_core::SalonError::Database(e.to_string()))?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(opts)
        .await
        .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;

    schema::init_db(&pool).await?;
    Ok(pool)
}
