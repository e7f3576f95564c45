//! Arithmetic operations and the pure evaluator.
//!
//! [`evaluate`] is the single source of truth for a calculation's `result`
//! field: it is called when a record is created and again on every edit, so
//! a stored result can never drift from its operands.

use core::fmt;

use serde::{Deserialize, Serialize};

/// The fixed set of supported arithmetic operations.
///
/// Serialized with PascalCase tags (`"Add"`, `"Divide"`, ...) to match the
/// wire format; anything outside this set is rejected at deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Modulo,
}

impl Operation {
    /// Returns the canonical tag for this operation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "Add",
            Self::Subtract => "Subtract",
            Self::Multiply => "Multiply",
            Self::Divide => "Divide",
            Self::Power => "Power",
            Self::Modulo => "Modulo",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored operation tag is not in the fixed set.
#[derive(thiserror::Error, Debug, Clone)]
#[error("unknown operation tag: {0}")]
pub struct OperationParseError(String);

impl std::str::FromStr for Operation {
    type Err = OperationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Add" => Ok(Self::Add),
            "Subtract" => Ok(Self::Subtract),
            "Multiply" => Ok(Self::Multiply),
            "Divide" => Ok(Self::Divide),
            "Power" => Ok(Self::Power),
            "Modulo" => Ok(Self::Modulo),
            other => Err(OperationParseError(other.to_owned())),
        }
    }
}

/// Errors produced by [`evaluate`] for mathematically undefined cases.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluateError {
    /// Division or modulo with a zero denominator.
    #[error("division by zero")]
    DivisionByZero,
    /// The result is undefined for these operands (e.g. a fractional power
    /// of a negative base).
    #[error("result is undefined for these operands")]
    Undefined,
}

/// Compute the result of `a <op> b`.
///
/// Pure function: no side effects, no I/O, deterministic for a given input.
///
/// # Errors
///
/// Returns [`EvaluateError::DivisionByZero`] for `Divide` or `Modulo` when
/// `b` is exactly `0.0`, and [`EvaluateError::Undefined`] when the numeric
/// result is not a number (fractional power of a negative base).
pub fn evaluate(a: f64, b: f64, op: Operation) -> Result<f64, EvaluateError> {
    let result = match op {
        Operation::Add => a + b,
        Operation::Subtract => a - b,
        Operation::Multiply => a * b,
        Operation::Divide => {
            if b == 0.0 {
                return Err(EvaluateError::DivisionByZero);
            }
            a / b
        }
        Operation::Power => a.powf(b),
        Operation::Modulo => {
            if b == 0.0 {
                return Err(EvaluateError::DivisionByZero);
            }
            a % b
        }
    };

    if result.is_nan() {
        return Err(EvaluateError::Undefined);
    }

    Ok(result)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        assert_eq!(evaluate(10.0, 5.0, Operation::Add).unwrap(), 15.0);
        assert_eq!(evaluate(10.0, 5.0, Operation::Subtract).unwrap(), 5.0);
        assert_eq!(evaluate(10.0, 5.0, Operation::Multiply).unwrap(), 50.0);
        assert_eq!(evaluate(10.0, 5.0, Operation::Divide).unwrap(), 2.0);
        assert_eq!(evaluate(2.0, 10.0, Operation::Power).unwrap(), 1024.0);
        assert_eq!(evaluate(10.0, 3.0, Operation::Modulo).unwrap(), 1.0);
    }

    #[test]
    fn test_fractional_and_negative_exponents() {
        assert_eq!(evaluate(9.0, 0.5, Operation::Power).unwrap(), 3.0);
        assert_eq!(evaluate(2.0, -1.0, Operation::Power).unwrap(), 0.5);
    }

    #[test]
    fn test_fractional_power_of_negative_base_is_reported() {
        assert_eq!(
            evaluate(-8.0, 0.5, Operation::Power),
            Err(EvaluateError::Undefined)
        );
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            evaluate(10.0, 0.0, Operation::Divide),
            Err(EvaluateError::DivisionByZero)
        );
        assert_eq!(
            evaluate(10.0, 0.0, Operation::Modulo),
            Err(EvaluateError::DivisionByZero)
        );
        // Negative zero compares equal to zero
        assert_eq!(
            evaluate(10.0, -0.0, Operation::Divide),
            Err(EvaluateError::DivisionByZero)
        );
    }

    #[test]
    fn test_determinism() {
        let first = evaluate(3.7, 1.9, Operation::Power).unwrap();
        let second = evaluate(3.7, 1.9, Operation::Power).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_negative_operands() {
        assert_eq!(evaluate(-10.0, 5.0, Operation::Add).unwrap(), -5.0);
        assert_eq!(evaluate(-10.0, -5.0, Operation::Divide).unwrap(), 2.0);
    }

    #[test]
    fn test_serde_tags() {
        let op: Operation = serde_json::from_str("\"Divide\"").unwrap();
        assert_eq!(op, Operation::Divide);
        assert_eq!(serde_json::to_string(&Operation::Add).unwrap(), "\"Add\"");
        // Unknown tags are rejected at the boundary
        assert!(serde_json::from_str::<Operation>("\"Sqrt\"").is_err());
        assert!(serde_json::from_str::<Operation>("\"add\"").is_err());
    }

    #[test]
    fn test_from_str_roundtrip() {
        for op in [
            Operation::Add,
            Operation::Subtract,
            Operation::Multiply,
            Operation::Divide,
            Operation::Power,
            Operation::Modulo,
        ] {
            assert_eq!(op.as_str().parse::<Operation>().unwrap(), op);
        }
        assert!("nonsense".parse::<Operation>().is_err());
    }
}
