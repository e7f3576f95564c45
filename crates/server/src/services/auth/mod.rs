//! Account registration, login, and profile management.
//!
//! The service owns the credential rules: password strength on the way in,
//! bcrypt digests at rest, and a single generic invalid-credentials outcome
//! for every login failure so callers cannot tell an unknown username from
//! a wrong password.

mod error;
mod password;
mod token;

pub use error::AuthError;
pub use password::{hash_password, verify_password};
pub use token::TokenService;

use chrono::{Duration, Utc};
use sqlx::SqlitePool;

use tally_core::{Email, UserId, Username};

use crate::db::users::{ProfileChanges, UserRepository};
use crate::models::user::User;

/// Minimum accepted password length, in characters.
const MIN_PASSWORD_CHARS: usize = 8;

/// A successful login: the bearer token plus the authenticated user.
#[derive(Debug)]
pub struct AuthenticatedSession {
    pub token: String,
    pub user: User,
}

/// Raw profile changes as submitted by a client; `None` fields are left
/// unchanged.
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub bio: Option<String>,
}

/// Authentication service.
pub struct AuthService<'a> {
    pool: &'a SqlitePool,
    tokens: &'a TokenService,
    login_token_ttl: Duration,
}

impl<'a> AuthService<'a> {
    /// Create a new auth service.
    #[must_use]
    pub const fn new(
        pool: &'a SqlitePool,
        tokens: &'a TokenService,
        login_token_ttl: Duration,
    ) -> Self {
        Self {
            pool,
            tokens,
            login_token_ttl,
        }
    }

    /// Register a new account.
    ///
    /// The password is validated and hashed before the insert; the stored
    /// digest never round-trips back out of this module.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidUsername` / `AuthError::InvalidEmail` for
    /// malformed identifiers, `AuthError::WeakPassword` for a too-short
    /// password, and `AuthError::Repository` with a conflict when the
    /// username or email is already taken.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let username = Username::parse(username)?;
        let email = Email::parse(email)?;
        validate_password(password)?;

        let digest = hash_password(password)?;

        let user = UserRepository::new(self.pool)
            .create(&username, &email, &digest)
            .await?;

        Ok(user)
    }

    /// Authenticate a username/password pair and issue a bearer token.
    ///
    /// On success the account's `last_login` is stamped before the token is
    /// issued.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` both when the username is
    /// unknown and when the password does not match.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthenticatedSession, AuthError> {
        let users = UserRepository::new(self.pool);

        let Some((mut user, digest)) = users.get_with_password(username).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, &digest) {
            return Err(AuthError::InvalidCredentials);
        }

        let now = Utc::now();
        users.stamp_last_login(user.id, now).await?;
        user.last_login = Some(now);

        let token = self.tokens.issue(user.id, Some(self.login_token_ttl))?;

        Ok(AuthenticatedSession { token, user })
    }

    /// Apply a partial profile update.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidUsername` / `AuthError::InvalidEmail` for
    /// malformed replacement values, `AuthError::UserNotFound` if the
    /// account no longer exists, and a repository conflict when the new
    /// username or email is already taken.
    pub async fn update_profile(
        &self,
        id: UserId,
        update: ProfileUpdate,
    ) -> Result<User, AuthError> {
        let changes = ProfileChanges {
            username: update.username.as_deref().map(Username::parse).transpose()?,
            email: update.email.as_deref().map(Email::parse).transpose()?,
            full_name: update.full_name,
            bio: update.bio,
        };

        match UserRepository::new(self.pool)
            .update_profile(id, &changes)
            .await
        {
            Ok(user) => Ok(user),
            Err(crate::db::RepositoryError::NotFound) => Err(AuthError::UserNotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the account's password after verifying the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::CurrentPasswordMismatch` if the supplied current
    /// password does not match the stored digest, and
    /// `AuthError::WeakPassword` if the replacement is too short.
    pub async fn change_password(
        &self,
        id: UserId,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let users = UserRepository::new(self.pool);

        let digest = match users.get_password_hash(id).await {
            Ok(digest) => digest,
            Err(crate::db::RepositoryError::NotFound) => return Err(AuthError::UserNotFound),
            Err(e) => return Err(e.into()),
        };

        if !verify_password(current_password, &digest) {
            return Err(AuthError::CurrentPasswordMismatch);
        }

        validate_password(new_password)?;
        let new_digest = hash_password(new_password)?;
        users.update_password(id, &new_digest).await?;

        Ok(())
    }
}

/// Enforce the password strength policy on new passwords.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }
    Ok(())
}
