//! Account routes: registration, login, profile, and user administration.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use tally_core::UserId;

use super::PageQuery;
use crate::db::users::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::user::User;
use crate::services::auth::{AuthService, ProfileUpdate};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/me", get(me).put(update_me))
        .route("/users/change-password", post(change_password))
        .route("/users", get(list_users))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    username: String,
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    access_token: String,
    token_type: &'static str,
    user_id: UserId,
}

#[derive(Debug, Deserialize)]
struct ProfileUpdateRequest {
    username: Option<String>,
    email: Option<String>,
    full_name: Option<String>,
    bio: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PasswordChangeRequest {
    current_password: String,
    new_password: String,
}

/// `POST /users/register` - create an account.
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let auth = AuthService::new(state.pool(), state.tokens(), state.login_token_ttl());
    let user = auth
        .register(&body.username, &body.email, &body.password)
        .await?;

    tracing::info!(user_id = %user.id, "Account registered");

    Ok((StatusCode::CREATED, Json(user)))
}

/// `POST /users/login` - exchange credentials for a bearer token.
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let auth = AuthService::new(state.pool(), state.tokens(), state.login_token_ttl());
    let session = auth.login(&body.username, &body.password).await?;

    Ok(Json(LoginResponse {
        access_token: session.token,
        token_type: "bearer",
        user_id: session.user.id,
    }))
}

/// `GET /users/me` - current account profile.
async fn me(RequireAuth(user): RequireAuth) -> Json<User> {
    Json(user)
}

/// `PUT /users/me` - partial profile update.
async fn update_me(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<ProfileUpdateRequest>,
) -> Result<Json<User>> {
    let auth = AuthService::new(state.pool(), state.tokens(), state.login_token_ttl());
    let updated = auth
        .update_profile(
            user.id,
            ProfileUpdate {
                username: body.username,
                email: body.email,
                full_name: body.full_name,
                bio: body.bio,
            },
        )
        .await?;

    Ok(Json(updated))
}

/// `POST /users/change-password` - rotate the password.
async fn change_password(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<PasswordChangeRequest>,
) -> Result<StatusCode> {
    let auth = AuthService::new(state.pool(), state.tokens(), state.login_token_ttl());
    auth.change_password(user.id, &body.current_password, &body.new_password)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// `GET /users` - list accounts with offset/limit pagination.
async fn list_users(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<User>>> {
    let (skip, limit) = page.clamped(10);
    let users = UserRepository::new(state.pool()).list(skip, limit).await?;

    Ok(Json(users))
}

/// `GET /users/{id}` - fetch one account.
async fn get_user(State(state): State<AppState>, Path(id): Path<UserId>) -> Result<Json<User>> {
    let user = UserRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_owned()))?;

    Ok(Json(user))
}

/// `PUT /users/{id}` - partial update of any account.
async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(body): Json<ProfileUpdateRequest>,
) -> Result<Json<User>> {
    let auth = AuthService::new(state.pool(), state.tokens(), state.login_token_ttl());
    let updated = auth
        .update_profile(
            id,
            ProfileUpdate {
                username: body.username,
                email: body.email,
                full_name: body.full_name,
                bio: body.bio,
            },
        )
        .await
        .map_err(|e| match e {
            // Unlike the bearer-authenticated paths, a missing account here
            // is a plain 404
            crate::services::auth::AuthError::UserNotFound => {
                AppError::NotFound("User".to_owned())
            }
            other => other.into(),
        })?;

    Ok(Json(updated))
}

/// `DELETE /users/{id}` - delete an account; its records cascade.
async fn delete_user(State(state): State<AppState>, Path(id): Path<UserId>) -> Result<StatusCode> {
    let deleted = UserRepository::new(state.pool()).delete(id).await?;
    if !deleted {
        return Err(AppError::NotFound("User".to_owned()));
    }

    tracing::info!(user_id = %id, "Account deleted");

    Ok(StatusCode::NO_CONTENT)
}
