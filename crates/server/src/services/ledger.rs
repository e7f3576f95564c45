//! Owner-scoped calculation records.
//!
//! The service recomputes the result from the stored operands on every
//! create and update; clients never supply a result, and a record whose
//! inputs cannot be evaluated is never written.

use sqlx::SqlitePool;
use thiserror::Error;

use tally_core::{CalculationId, EvaluateError, Operation, UserId, evaluate};

use crate::db::RepositoryError;
use crate::db::calculations::CalculationRepository;
use crate::models::calculation::{Calculation, CalculationSummary};

/// Errors returned by ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The operand/operation triple has no defined result.
    #[error(transparent)]
    InvalidOperation(#[from] EvaluateError),

    /// No matching record visible to this owner. Covers both a missing ID
    /// and an ID owned by someone else.
    #[error("calculation not found")]
    NotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Partial update to a calculation; `None` fields keep their stored value.
#[derive(Debug, Default, Clone, Copy)]
pub struct CalculationPatch {
    pub a: Option<f64>,
    pub b: Option<f64>,
    pub operation: Option<Operation>,
}

/// Service for calculation records, always acting on behalf of one owner.
pub struct LedgerService<'a> {
    calculations: CalculationRepository<'a>,
}

impl<'a> LedgerService<'a> {
    /// Create a new ledger service.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self {
            calculations: CalculationRepository::new(pool),
        }
    }

    /// Evaluate and persist a new record for `owner`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidOperation` when the inputs cannot be
    /// evaluated; nothing is persisted in that case.
    pub async fn create(
        &self,
        owner: UserId,
        a: f64,
        b: f64,
        operation: Operation,
    ) -> Result<Calculation, LedgerError> {
        let result = evaluate(a, b, operation)?;

        Ok(self
            .calculations
            .create(owner, a, b, operation, result)
            .await?)
    }

    /// List `owner`'s records, newest first.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Repository` if the query fails.
    pub async fn list(
        &self,
        owner: UserId,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Calculation>, LedgerError> {
        Ok(self.calculations.list_for_owner(owner, offset, limit).await?)
    }

    /// Fetch one of `owner`'s records.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NotFound` when the ID is absent or owned by a
    /// different account.
    pub async fn get(&self, owner: UserId, id: CalculationId) -> Result<Calculation, LedgerError> {
        self.calculations
            .get_for_owner(owner, id)
            .await?
            .ok_or(LedgerError::NotFound)
    }

    /// Apply a partial update and recompute the result.
    ///
    /// The stored record fills in whatever the patch leaves out; if the
    /// merged inputs cannot be evaluated the stored record is left
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NotFound` when the ID is absent or owned by a
    /// different account, and `LedgerError::InvalidOperation` when the
    /// merged inputs have no defined result.
    pub async fn update(
        &self,
        owner: UserId,
        id: CalculationId,
        patch: CalculationPatch,
    ) -> Result<Calculation, LedgerError> {
        let current = self.get(owner, id).await?;

        let a = patch.a.unwrap_or(current.a);
        let b = patch.b.unwrap_or(current.b);
        let operation = patch.operation.unwrap_or(current.operation);

        // Evaluate before touching the row
        let result = evaluate(a, b, operation)?;

        self.calculations
            .update_for_owner(owner, id, a, b, operation, result)
            .await?
            .ok_or(LedgerError::NotFound)
    }

    /// Delete one of `owner`'s records.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NotFound` when the ID is absent or owned by a
    /// different account.
    pub async fn delete(&self, owner: UserId, id: CalculationId) -> Result<(), LedgerError> {
        if self.calculations.delete_for_owner(owner, id).await? {
            Ok(())
        } else {
            Err(LedgerError::NotFound)
        }
    }

    /// Aggregate statistics over `owner`'s records.
    ///
    /// An empty account yields a summary of zeros and `None`s rather than
    /// an error. Ties for the most used operation resolve to the lexically
    /// smallest tag.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Repository` if a query fails.
    pub async fn summarize(&self, owner: UserId) -> Result<CalculationSummary, LedgerError> {
        let breakdown = self.calculations.operation_breakdown(owner).await?;
        let average_result = self.calculations.average_result(owner).await?;
        let last_result = self.calculations.latest_result(owner).await?;

        let total = breakdown.values().sum();

        // BTreeMap iterates in key order; keeping only strictly greater
        // counts makes the lexically smallest tag win ties
        let most_used_operation = breakdown
            .iter()
            .fold(None::<(&String, i64)>, |best, (tag, &count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((tag, count)),
            })
            .map(|(tag, _)| tag.clone());

        Ok(CalculationSummary {
            total,
            average_result,
            last_result,
            operations_breakdown: breakdown,
            most_used_operation,
        })
    }
}
