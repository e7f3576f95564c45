//! User domain type.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tally_core::{Email, UserId, Username};

/// A registered account (domain type).
///
/// The password digest lives only in the `users` table and in the auth
/// service; it is deliberately absent here so it can never be serialized
/// outward.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Unique username (3-50 characters).
    pub username: Username,
    /// Unique email address.
    pub email: Email,
    /// Optional display name.
    pub full_name: Option<String>,
    /// Optional profile text.
    pub bio: Option<String>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account last authenticated successfully.
    pub last_login: Option<DateTime<Utc>>,
}
