use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use uuid::Uuid;

use crate::auth::AuthAccount;
use crate::db::models::{Order, Role};
use crate::error::ApiError;
use crate::services::order::{self, OrderView};
use crate::state::AppState;

pub async fn submit(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
) -> Result<(StatusCode, Json<OrderView>), ApiError> {
    let patient_id = auth.require_role(Role::Patient)?;
    let view = order::submit_order(&state.pool, patient_id).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(order::list_orders(&state.pool, &auth).await?))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderView>, ApiError> {
    Ok(Json(order::get_order(&state.pool, &auth, id).await?))
}

pub async fn approve(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, ApiError> {
    let pharmacy_id = auth.require_role(Role::Pharmacy)?;
    Ok(Json(order::decide(&state.pool, pharmacy_id, id, true).await?))
}

pub async fn reject(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, ApiError> {
    let pharmacy_id = auth.require_role(Role::Pharmacy)?;
    Ok(Json(order::decide(&state.pool, pharmacy_id, id, false).await?))
}

pub async fn cancel(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, ApiError> {
    let patient_id = auth.require_role(Role::Patient)?;
    Ok(Json(order::cancel(&state.pool, patient_id, id).await?))
}
