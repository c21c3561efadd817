use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthAccount;
use crate::db::models::{Drug, DrugOffer, Role};
use crate::error::ApiError;
use crate::services::catalog::{self, CreateDrug, UpdateDrug};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateDrugRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Deserialize)]
pub struct UpdateDrugRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Drug>>, ApiError> {
    let drugs = catalog::list_drugs(&state.pool, query.search.as_deref()).await?;
    Ok(Json(drugs))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Drug>, ApiError> {
    Ok(Json(catalog::get_drug(&state.pool, id).await?))
}

pub async fn offers(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<DrugOffer>>, ApiError> {
    Ok(Json(catalog::drug_offers(&state.pool, id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
    Json(req): Json<CreateDrugRequest>,
) -> Result<(StatusCode, Json<Drug>), ApiError> {
    auth.require_role(Role::Admin)?;
    let drug = catalog::create_drug(
        &state.pool,
        CreateDrug {
            name: req.name,
            description: req.description,
            category: req.category,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(drug)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateDrugRequest>,
) -> Result<Json<Drug>, ApiError> {
    auth.require_role(Role::Admin)?;
    let drug = catalog::update_drug(
        &state.pool,
        id,
        UpdateDrug {
            name: req.name,
            description: req.description,
            category: req.category,
        },
    )
    .await?;
    Ok(Json(drug))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    auth.require_role(Role::Admin)?;
    catalog::delete_drug(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
