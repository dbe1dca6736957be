//! SQLite relational store
//!
//! Holds report, task, comment, idea and trend-keyword rows plus the locally
//! mirrored video/channel tables. Pool setup applies the schema idempotently;
//! repositories are free functions over `SqlitePool` (one file per aggregate).

pub mod repositories;
pub mod schema;

use std::path::Path;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use crate::core::constants::{SQLITE_BUSY_TIMEOUT_SECS, SQLITE_MAX_CONNECTIONS};
use crate::data::error::DataError;

/// Open (creating if needed) the SQLite database at `path` and apply the schema
pub async fn init_pool(path: &Path) -> Result<SqlitePool, DataError> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(SQLITE_BUSY_TIMEOUT_SECS));

    let pool = SqlitePoolOptions::new()
        .max_connections(SQLITE_MAX_CONNECTIONS)
        .connect_with(options)
        .await?;

    apply_schema(&pool).await?;
    tracing::debug!(path = %path.display(), "SQLite pool initialized");
    Ok(pool)
}

/// In-memory pool for tests
#[cfg(test)]
pub async fn init_memory_pool() -> Result<SqlitePool, DataError> {
    use std::str::FromStr;

    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(sqlx::Error::from)?;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    apply_schema(&pool).await?;
    Ok(pool)
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), DataError> {
    // SQLite executes one statement per call; split on the blank-line-free
    // statement boundaries in the schema constant.
    for statement in schema::SCHEMA.split(';') {
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
