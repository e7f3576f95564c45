//! Calculation routes, all bearer-authenticated and owner-scoped.
//!
//! The `/calculations/summary` route is registered before the `{id}`
//! matcher would otherwise swallow it; axum resolves the literal segment
//! first regardless, but keeping it separate makes the intent obvious.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;

use tally_core::{CalculationId, Operation};

use super::PageQuery;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::calculation::{Calculation, CalculationSummary};
use crate::services::ledger::{CalculationPatch, LedgerService};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/calculations", get(list).post(create))
        .route("/calculations/summary", get(summary))
        .route(
            "/calculations/{id}",
            get(get_one).put(update).patch(update).delete(delete_one),
        )
}

#[derive(Debug, Deserialize)]
struct CalculationCreateRequest {
    a: f64,
    b: f64,
    #[serde(rename = "type")]
    operation: Operation,
}

#[derive(Debug, Deserialize)]
struct CalculationUpdateRequest {
    a: Option<f64>,
    b: Option<f64>,
    #[serde(rename = "type")]
    operation: Option<Operation>,
}

/// `POST /calculations` - evaluate and persist a new record.
async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<CalculationCreateRequest>,
) -> Result<(StatusCode, Json<Calculation>)> {
    let calculation = LedgerService::new(state.pool())
        .create(user.id, body.a, body.b, body.operation)
        .await?;

    Ok((StatusCode::CREATED, Json(calculation)))
}

/// `GET /calculations` - list own records, newest first.
async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<Calculation>>> {
    let (skip, limit) = page.clamped(100);
    let calculations = LedgerService::new(state.pool())
        .list(user.id, skip, limit)
        .await?;

    Ok(Json(calculations))
}

/// `GET /calculations/summary` - aggregate statistics over own records.
async fn summary(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CalculationSummary>> {
    let summary = LedgerService::new(state.pool()).summarize(user.id).await?;

    Ok(Json(summary))
}

/// `GET /calculations/{id}` - fetch one own record.
async fn get_one(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<CalculationId>,
) -> Result<Json<Calculation>> {
    let calculation = LedgerService::new(state.pool()).get(user.id, id).await?;

    Ok(Json(calculation))
}

/// `PUT|PATCH /calculations/{id}` - partial update with recomputed result.
async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<CalculationId>,
    Json(body): Json<CalculationUpdateRequest>,
) -> Result<Json<Calculation>> {
    let calculation = LedgerService::new(state.pool())
        .update(
            user.id,
            id,
            CalculationPatch {
                a: body.a,
                b: body.b,
                operation: body.operation,
            },
        )
        .await?;

    Ok(Json(calculation))
}

/// `DELETE /calculations/{id}` - delete one own record.
async fn delete_one(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<CalculationId>,
) -> Result<StatusCode> {
    LedgerService::new(state.pool()).delete(user.id, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
