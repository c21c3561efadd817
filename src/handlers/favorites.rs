use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthAccount;
use crate::db::models::{Drug, Role};
use crate::error::ApiError;
use crate::services::favorites;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AddFavoriteRequest {
    pub drug_id: Uuid,
}

pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
) -> Result<Json<Vec<Drug>>, ApiError> {
    let patient_id = auth.require_role(Role::Patient)?;
    Ok(Json(favorites::list_favorites(&state.pool, patient_id).await?))
}

pub async fn add(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
    Json(req): Json<AddFavoriteRequest>,
) -> Result<StatusCode, ApiError> {
    let patient_id = auth.require_role(Role::Patient)?;
    favorites::add_favorite(&state.pool, patient_id, req.drug_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
    Path(drug_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let patient_id = auth.require_role(Role::Patient)?;
    favorites::remove_favorite(&state.pool, patient_id, drug_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
