//! Stateless bearer token issuing and verification.
//!
//! Tokens are HS256-signed JWTs carrying the subject's user ID and an
//! absolute expiry. There is no server-side session store; possession of a
//! token with a valid signature and a future expiry is the whole proof.
//!
//! Verification collapses every failure mode (bad signature, malformed
//! structure, missing subject, expired) into a single `InvalidToken`
//! outcome so callers cannot probe which check failed.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use tally_core::UserId;

use super::AuthError;

/// Token lifetime used when the caller does not specify one.
const DEFAULT_TTL_MINUTES: i64 = 15;

/// Claim set carried by every token.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Subject: the user's ID.
    sub: UserId,
    /// Absolute expiry as a unix timestamp.
    exp: i64,
}

/// Issues and verifies bearer tokens with a single process-wide secret.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenService {
    /// Create a token service from the injected signing secret.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        // No grace period: an expired token is invalid the moment it expires
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            validation,
        }
    }

    /// Issue a signed token for `user_id`, valid for `ttl` (15 minutes when
    /// unspecified).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenSigning` if encoding fails.
    pub fn issue(&self, user_id: UserId, ttl: Option<Duration>) -> Result<String, AuthError> {
        let ttl = ttl.unwrap_or_else(|| Duration::minutes(DEFAULT_TTL_MINUTES));
        let claims = Claims {
            sub: user_id,
            exp: (Utc::now() + ttl).timestamp(),
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
            .map_err(|_| AuthError::TokenSigning)
    }

    /// Verify a token and return its subject.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for every failure mode.
    pub fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|_| AuthError::InvalidToken)?;

        Ok(data.claims.sub)
    }
}
