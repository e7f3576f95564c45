//! Database operations for the Tally `SQLite` store.
//!
//! ## Tables
//!
//! - `users` - Registered accounts with password digests
//! - `calculations` - Calculation records, each owned by exactly one account
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and embedded at
//! compile time via `sqlx::migrate!`; they run on startup and in tests.

pub mod calculations;
pub mod users;

use core::fmt;
use std::str::FromStr;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;

/// Which unique column a conflicting write collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictField {
    Username,
    Email,
}

impl fmt::Display for ConflictField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Username => f.write_str("username"),
            Self::Email => f.write_str("email"),
        }
    }
}

/// Errors returned by the repository layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Unique constraint violation on the named field.
    #[error("{0} already exists")]
    Conflict(ConflictField),
}

/// Create a `SQLite` connection pool with sensible defaults.
///
/// Foreign key enforcement is on (sqlx default), so deleting a user
/// cascades to their calculations.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url.expose_secret())?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(10));

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}

/// Map a sqlx error from an insert/update to a `Conflict` when it is a
/// unique constraint violation on a known column.
fn map_unique_violation(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        // SQLite reports "UNIQUE constraint failed: users.username"
        let message = db_err.message().to_owned();
        if message.contains("users.username") {
            return RepositoryError::Conflict(ConflictField::Username);
        }
        if message.contains("users.email") {
            return RepositoryError::Conflict(ConflictField::Email);
        }
    }
    RepositoryError::Database(e)
}

/// In-memory pool for unit tests, with migrations applied.
///
/// A single connection with recycling disabled, so the in-memory database
/// survives for the life of the pool.
#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect(":memory:")
        .await
        .unwrap();

    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    pool
}
