//! Authentication middleware and extractors.
//!
//! Provides an extractor for requiring a valid bearer token in route
//! handlers. Every rejection is the same 401; a missing header, a forged
//! token, an expired token, and a token for a deleted account are not
//! distinguishable from outside.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};

use crate::db::users::UserRepository;
use crate::models::user::User;
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
///
/// Verifies the `Authorization: Bearer` token and loads the account it
/// names, so handlers receive a live [`User`] rather than a raw claim set.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireAuth(pub User);

/// Rejection returned when the bearer token is missing or invalid.
pub struct AuthRejection;

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            axum::Json(serde_json::json!({ "error": "Invalid credentials" })),
        )
            .into_response()
    }
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(AuthRejection)?;

        let user_id = state.tokens().verify(token).map_err(|_| AuthRejection)?;

        // A valid token for a since-deleted account still fails
        let user = UserRepository::new(state.pool())
            .get_by_id(user_id)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to load authenticated user");
                AuthRejection
            })?
            .ok_or_else(|| {
                tracing::debug!(%user_id, "Token subject no longer exists");
                AuthRejection
            })?;

        Ok(Self(user))
    }
}
