use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthAccount;
use crate::db::models::{CartItem, Role};
use crate::error::ApiError;
use crate::services::cart::{self, BulkAdd, BulkOutcome, CartView};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub drug_id: Uuid,
    pub pharmacy_id: Uuid,
    pub quantity: i32,
}

#[derive(Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i32,
}

pub async fn view(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
) -> Result<Json<CartView>, ApiError> {
    let patient_id = auth.require_role(Role::Patient)?;
    Ok(Json(cart::view_cart(&state.pool, patient_id).await?))
}

pub async fn add(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
    Json(req): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<CartItem>), ApiError> {
    let patient_id = auth.require_role(Role::Patient)?;
    let item = cart::add_item(
        &state.pool,
        patient_id,
        req.drug_id,
        req.pharmacy_id,
        req.quantity,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn add_bulk(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
    Json(lines): Json<Vec<BulkAdd>>,
) -> Result<Json<Vec<BulkOutcome>>, ApiError> {
    let patient_id = auth.require_role(Role::Patient)?;
    Ok(Json(cart::add_items(&state.pool, patient_id, lines).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
    Path((pharmacy_id, drug_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<CartItem>, ApiError> {
    let patient_id = auth.require_role(Role::Patient)?;
    let item = cart::update_item(&state.pool, patient_id, drug_id, pharmacy_id, req.quantity).await?;
    Ok(Json(item))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
    Path((pharmacy_id, drug_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let patient_id = auth.require_role(Role::Patient)?;
    cart::remove_item(&state.pool, patient_id, drug_id, pharmacy_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn clear(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
) -> Result<StatusCode, ApiError> {
    let patient_id = auth.require_role(Role::Patient)?;
    cart::clear_cart(&state.pool, patient_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
