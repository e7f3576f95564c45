//! HTTP route handlers.
//!
//! ## Route table
//!
//! | Method | Path | Auth | Description |
//! |--------|------|------|-------------|
//! | POST | `/users/register` | - | Create an account |
//! | POST | `/users/login` | - | Exchange credentials for a bearer token |
//! | GET | `/users/me` | bearer | Current account profile |
//! | PUT | `/users/me` | bearer | Partial profile update |
//! | POST | `/users/change-password` | bearer | Rotate the password |
//! | GET | `/users` | - | List accounts (paginated) |
//! | GET | `/users/{id}` | - | Fetch one account |
//! | PUT | `/users/{id}` | - | Partial update of any account |
//! | DELETE | `/users/{id}` | - | Delete an account and its records |
//! | POST | `/calculations` | bearer | Create a record |
//! | GET | `/calculations` | bearer | List own records (paginated) |
//! | GET | `/calculations/summary` | bearer | Aggregate statistics |
//! | GET | `/calculations/{id}` | bearer | Fetch one own record |
//! | PUT | `/calculations/{id}` | bearer | Update a record, recompute result |
//! | PATCH | `/calculations/{id}` | bearer | Same as PUT |
//! | DELETE | `/calculations/{id}` | bearer | Delete a record |
//! | GET | `/health` | - | Liveness |
//! | GET | `/health/ready` | - | Readiness (checks the database) |

pub mod calculations;
pub mod users;

use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::Deserialize;

use crate::state::AppState;

/// Offset/limit pagination query, `skip`/`limit` names.
///
/// The default limit differs per listing, so it is supplied by the caller.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub skip: i64,
    pub limit: Option<i64>,
}

impl PageQuery {
    /// Clamp to sane bounds; a negative skip or limit is treated as zero.
    #[must_use]
    pub fn clamped(&self, default_limit: i64) -> (i64, i64) {
        (
            self.skip.max(0),
            self.limit.unwrap_or(default_limit).clamp(0, 1000),
        )
    }
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(users::router())
        .merge(calculations::router())
        .route("/health", get(health))
        .route("/health/ready", get(ready))
        .with_state(state)
}

/// Liveness probe.
async fn health() -> &'static str {
    "ok"
}

/// Readiness probe; verifies the database answers.
async fn ready(State(state): State<AppState>) -> StatusCode {
    match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(state.pool())
        .await
    {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::error!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
