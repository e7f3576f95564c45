//! Calculation domain types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use tally_core::{CalculationId, Operation, UserId};

/// An owned calculation record (domain type).
///
/// `result` is always the value of `evaluate(a, b, operation)` at the moment
/// of the last write; callers can never set it directly.
#[derive(Debug, Clone, Serialize)]
pub struct Calculation {
    /// Unique record ID.
    pub id: CalculationId,
    /// Account that owns this record; immutable after creation.
    pub user_id: UserId,
    /// First operand.
    pub a: f64,
    /// Second operand.
    pub b: f64,
    /// Operation applied to the operands.
    #[serde(rename = "type")]
    pub operation: Operation,
    /// Computed result.
    pub result: f64,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last modified.
    pub updated_at: DateTime<Utc>,
}

/// Aggregate metrics over one account's calculations.
///
/// The breakdown is keyed by operation tag in lexical order, which also
/// fixes the `most_used_operation` tie-break: the lexically smallest tag
/// among those sharing the maximum count wins.
#[derive(Debug, Clone, Serialize)]
pub struct CalculationSummary {
    /// Number of records owned by the account.
    pub total: i64,
    /// Arithmetic mean of `result` over all records; absent when there are none.
    pub average_result: Option<f64>,
    /// `result` of the most recently created record; absent when there are none.
    pub last_result: Option<f64>,
    /// Occurrence count per operation tag present.
    pub operations_breakdown: BTreeMap<String, i64>,
    /// Most frequently used operation tag; absent when there are no records.
    pub most_used_operation: Option<String>,
}
