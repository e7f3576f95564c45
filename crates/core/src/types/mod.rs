//! Shared domain types.

pub mod email;
pub mod id;
pub mod operation;
pub mod username;

pub use email::{Email, EmailError};
pub use id::{CalculationId, UserId};
pub use operation::{EvaluateError, Operation, OperationParseError, evaluate};
pub use username::{Username, UsernameError};
