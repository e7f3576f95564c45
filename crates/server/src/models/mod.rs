//! Domain models.
//!
//! These types represent validated domain objects separate from database
//! row types; none of them carries a password digest.

pub mod calculation;
pub mod user;

pub use calculation::{Calculation, CalculationSummary};
pub use user::User;
