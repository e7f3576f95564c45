//! Calculation repository for database operations.
//!
//! Every query in this module carries an explicit `user_id` predicate, so
//! an operation can never see or touch another account's records. Handlers
//! and services go through these methods instead of writing their own SQL,
//! which makes omitting the owner filter structurally hard.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use tally_core::{CalculationId, Operation, UserId};

use super::RepositoryError;
use crate::models::calculation::Calculation;

/// Column list shared by every calculation query.
const CALC_COLUMNS: &str = "id, user_id, a, b, operation, result, created_at, updated_at";

/// Raw `calculations` row.
#[derive(sqlx::FromRow)]
struct CalculationRow {
    id: CalculationId,
    user_id: UserId,
    a: f64,
    b: f64,
    operation: String,
    result: f64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CalculationRow {
    fn into_calculation(self) -> Result<Calculation, RepositoryError> {
        let operation = self.operation.parse::<Operation>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid operation in database: {e}"))
        })?;

        Ok(Calculation {
            id: self.id,
            user_id: self.user_id,
            a: self.a,
            b: self.b,
            operation,
            result: self.result,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Repository for owner-scoped calculation operations.
pub struct CalculationRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CalculationRepository<'a> {
    /// Create a new calculation repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new record for `owner` with an already-computed result.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        owner: UserId,
        a: f64,
        b: f64,
        operation: Operation,
        result: f64,
    ) -> Result<Calculation, RepositoryError> {
        let id = CalculationId::generate();
        let now = Utc::now();

        let row = sqlx::query_as::<_, CalculationRow>(
            "INSERT INTO calculations (id, user_id, a, b, operation, result, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7) \
             RETURNING id, user_id, a, b, operation, result, created_at, updated_at",
        )
        .bind(id)
        .bind(owner)
        .bind(a)
        .bind(b)
        .bind(operation.as_str())
        .bind(result)
        .bind(now)
        .fetch_one(self.pool)
        .await?;

        row.into_calculation()
    }

    /// List `owner`'s records, newest first, with offset/limit pagination.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_owner(
        &self,
        owner: UserId,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Calculation>, RepositoryError> {
        let rows = sqlx::query_as::<_, CalculationRow>(&format!(
            "SELECT {CALC_COLUMNS} FROM calculations \
             WHERE user_id = ?1 \
             ORDER BY created_at DESC \
             LIMIT ?2 OFFSET ?3"
        ))
        .bind(owner)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(CalculationRow::into_calculation)
            .collect()
    }

    /// Get one of `owner`'s records by ID.
    ///
    /// Returns `None` both when the ID does not exist and when it belongs
    /// to a different owner; the two cases are indistinguishable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_owner(
        &self,
        owner: UserId,
        id: CalculationId,
    ) -> Result<Option<Calculation>, RepositoryError> {
        let row = sqlx::query_as::<_, CalculationRow>(&format!(
            "SELECT {CALC_COLUMNS} FROM calculations WHERE id = ?1 AND user_id = ?2"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(self.pool)
        .await?;

        row.map(CalculationRow::into_calculation).transpose()
    }

    /// Overwrite the operand/operation triple and result of one of
    /// `owner`'s records in a single statement.
    ///
    /// Returns `None` under the same rules as [`Self::get_for_owner`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update_for_owner(
        &self,
        owner: UserId,
        id: CalculationId,
        a: f64,
        b: f64,
        operation: Operation,
        result: f64,
    ) -> Result<Option<Calculation>, RepositoryError> {
        let row = sqlx::query_as::<_, CalculationRow>(
            "UPDATE calculations \
             SET a = ?1, b = ?2, operation = ?3, result = ?4, updated_at = ?5 \
             WHERE id = ?6 AND user_id = ?7 \
             RETURNING id, user_id, a, b, operation, result, created_at, updated_at",
        )
        .bind(a)
        .bind(b)
        .bind(operation.as_str())
        .bind(result)
        .bind(Utc::now())
        .bind(id)
        .bind(owner)
        .fetch_optional(self.pool)
        .await?;

        row.map(CalculationRow::into_calculation).transpose()
    }

    /// Delete one of `owner`'s records.
    ///
    /// # Returns
    ///
    /// Returns `true` if a record was deleted, `false` if no record matched
    /// (absent or owned by someone else).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_for_owner(
        &self,
        owner: UserId,
        id: CalculationId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM calculations WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(owner)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count `owner`'s records per operation tag, keyed lexically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn operation_breakdown(
        &self,
        owner: UserId,
    ) -> Result<BTreeMap<String, i64>, RepositoryError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT operation, COUNT(*) FROM calculations WHERE user_id = ?1 GROUP BY operation",
        )
        .bind(owner)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    /// Arithmetic mean of `result` over `owner`'s records, `None` when the
    /// account has none (never a division by zero).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn average_result(&self, owner: UserId) -> Result<Option<f64>, RepositoryError> {
        let average: Option<f64> =
            sqlx::query_scalar("SELECT AVG(result) FROM calculations WHERE user_id = ?1")
                .bind(owner)
                .fetch_one(self.pool)
                .await?;

        Ok(average)
    }

    /// `result` of `owner`'s most recently created record, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest_result(&self, owner: UserId) -> Result<Option<f64>, RepositoryError> {
        let result: Option<f64> = sqlx::query_scalar(
            "SELECT result FROM calculations WHERE user_id = ?1 \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(owner)
        .fetch_optional(self.pool)
        .await?;

        Ok(result)
    }
}
