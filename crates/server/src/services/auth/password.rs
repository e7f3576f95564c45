//! Password hashing and verification.
//!
//! Digests are bcrypt with a per-call random salt, so hashing the same
//! plaintext twice never yields the same digest. Verification fails closed:
//! a malformed or foreign-scheme digest is reported as a plain mismatch,
//! never as a distinguishable error.

use super::AuthError;

/// bcrypt work factor. Each increment doubles hashing cost.
const BCRYPT_COST: u32 = 12;

/// Hash a plaintext password.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the plaintext is empty and
/// `AuthError::PasswordHash` if hashing itself fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    if password.is_empty() {
        return Err(AuthError::WeakPassword(
            "password cannot be empty".to_owned(),
        ));
    }

    bcrypt::hash(password, BCRYPT_COST).map_err(|_| AuthError::PasswordHash)
}

/// Verify a plaintext password against a stored digest.
///
/// bcrypt's comparison is constant-time with respect to where a mismatch
/// occurs. Any digest that bcrypt cannot parse counts as a mismatch.
#[must_use]
pub fn verify_password(password: &str, digest: &str) -> bool {
    bcrypt::verify(password, digest).unwrap_or(false)
}
