use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthAccount;
use crate::db::models::{PharmacyProduct, Role, StockLine};
use crate::error::ApiError;
use crate::services::stock::{self, UpsertListing};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UpsertListingRequest {
    pub drug_id: Uuid,
    pub price_cents: i64,
    pub quantity_available: i32,
}

#[derive(Deserialize)]
pub struct AdjustQuantityRequest {
    pub delta: i32,
}

/// A pharmacy's own stock.
pub async fn list_own(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
) -> Result<Json<Vec<StockLine>>, ApiError> {
    let pharmacy_id = auth.require_role(Role::Pharmacy)?;
    Ok(Json(stock::list_stock(&state.pool, pharmacy_id).await?))
}

/// Any authenticated caller may browse a pharmacy's listings.
pub async fn list_for_pharmacy(
    State(state): State<AppState>,
    Path(pharmacy_id): Path<Uuid>,
) -> Result<Json<Vec<StockLine>>, ApiError> {
    Ok(Json(stock::list_stock(&state.pool, pharmacy_id).await?))
}

pub async fn upsert(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
    Json(req): Json<UpsertListingRequest>,
) -> Result<Json<PharmacyProduct>, ApiError> {
    let pharmacy_id = auth.require_role(Role::Pharmacy)?;
    let listing = stock::upsert_listing(
        &state.pool,
        pharmacy_id,
        UpsertListing {
            drug_id: req.drug_id,
            price_cents: req.price_cents,
            quantity_available: req.quantity_available,
        },
    )
    .await?;
    Ok(Json(listing))
}

pub async fn adjust(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
    Path(drug_id): Path<Uuid>,
    Json(req): Json<AdjustQuantityRequest>,
) -> Result<Json<PharmacyProduct>, ApiError> {
    let pharmacy_id = auth.require_role(Role::Pharmacy)?;
    let listing = stock::adjust_quantity(&state.pool, pharmacy_id, drug_id, req.delta).await?;
    Ok(Json(listing))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
    Path(drug_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let pharmacy_id = auth.require_role(Role::Pharmacy)?;
    stock::remove_listing(&state.pool, pharmacy_id, drug_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
