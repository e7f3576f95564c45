//! User repository for database operations.
//!
//! Rows are fetched into [`UserRow`] and converted into the validated
//! domain [`User`]; values that fail domain validation surface as
//! `RepositoryError::DataCorruption`.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use tally_core::{Email, UserId, Username};

use super::{RepositoryError, map_unique_violation};
use crate::models::user::User;

/// Column list shared by every user query.
const USER_COLUMNS: &str = "id, username, email, password_hash, full_name, bio, created_at, last_login";

/// Raw `users` row.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    username: String,
    email: String,
    password_hash: String,
    full_name: Option<String>,
    bio: Option<String>,
    created_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
}

impl UserRow {
    /// Convert a row into the domain type, dropping the password digest.
    fn into_user(self) -> Result<User, RepositoryError> {
        let username = Username::parse(&self.username).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid username in database: {e}"))
        })?;
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(User {
            id: self.id,
            username,
            email,
            full_name: self.full_name,
            bio: self.bio,
            created_at: self.created_at,
            last_login: self.last_login,
        })
    }
}

/// Partial profile update; `None` fields are left unchanged.
#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub username: Option<Username>,
    pub email: Option<Email>,
    pub full_name: Option<String>,
    pub bio: Option<String>,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new user with an already-hashed password.
    ///
    /// The insert is all-or-nothing: a uniqueness violation leaves no
    /// partial row behind.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` naming the colliding field if the
    /// username or email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        username: &Username,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let id = UserId::generate();
        let now = Utc::now();

        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, username, email, password_hash, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             RETURNING id, username, email, password_hash, full_name, bio, created_at, last_login",
        )
        .bind(id)
        .bind(username.as_str())
        .bind(email.as_str())
        .bind(password_hash)
        .bind(now)
        .fetch_one(self.pool)
        .await
        .map_err(map_unique_violation)?;

        row.into_user()
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if stored values are invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    /// Get a user together with their password digest, by username.
    ///
    /// Returns `None` if no such user exists; the caller is responsible for
    /// collapsing that case into a generic invalid-credentials outcome.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_password(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?1"
        ))
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let password_hash = row.password_hash.clone();
        Ok(Some((row.into_user()?, password_hash)))
    }

    /// Get a user's password digest by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn get_password_hash(&self, id: UserId) -> Result<String, RepositoryError> {
        let hash: Option<String> =
            sqlx::query_scalar("SELECT password_hash FROM users WHERE id = ?1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        hash.ok_or(RepositoryError::NotFound)
    }

    /// Apply a partial profile update and return the updated user.
    ///
    /// Absent fields keep their current value; the whole update is a single
    /// statement, so a uniqueness conflict leaves the row untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Conflict` naming the colliding field on a
    /// uniqueness violation.
    pub async fn update_profile(
        &self,
        id: UserId,
        changes: &ProfileChanges,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            "UPDATE users SET \
                username = COALESCE(?1, username), \
                email = COALESCE(?2, email), \
                full_name = COALESCE(?3, full_name), \
                bio = COALESCE(?4, bio) \
             WHERE id = ?5 \
             RETURNING id, username, email, password_hash, full_name, bio, created_at, last_login",
        )
        .bind(changes.username.as_ref().map(Username::as_str))
        .bind(changes.email.as_ref().map(Email::as_str))
        .bind(changes.full_name.as_deref())
        .bind(changes.bio.as_deref())
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(map_unique_violation)?;

        row.ok_or(RepositoryError::NotFound)?.into_user()
    }

    /// Replace a user's password digest.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET password_hash = ?1 WHERE id = ?2")
            .bind(password_hash)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Stamp the time of a successful authentication.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn stamp_last_login(
        &self,
        id: UserId,
        when: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET last_login = ?1 WHERE id = ?2")
            .bind(when)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// List users in insertion order with offset/limit pagination.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, offset: i64, limit: i64) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, username ASC \
             LIMIT ?1 OFFSET ?2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(UserRow::into_user).collect()
    }

    /// Delete a user; their calculations cascade at the schema level.
    ///
    /// # Returns
    ///
    /// Returns `true` if the user was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
