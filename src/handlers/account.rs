use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::auth::AuthAccount;
use crate::db::models::Account;
use crate::error::ApiError;
use crate::services::account::{self, NewPatient, NewPharmacy, Profile};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RegisterPatientRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Deserialize)]
pub struct RegisterPharmacyRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
}

pub async fn register_patient(
    State(state): State<AppState>,
    Json(req): Json<RegisterPatientRequest>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let account = account::register_patient(
        &state.pool,
        NewPatient {
            email: req.email,
            password: req.password,
            full_name: req.full_name,
            phone: req.phone,
            address: req.address,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn register_pharmacy(
    State(state): State<AppState>,
    Json(req): Json<RegisterPharmacyRequest>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let account = account::register_pharmacy(
        &state.pool,
        NewPharmacy {
            email: req.email,
            password: req.password,
            name: req.name,
            phone: req.phone,
            address: req.address,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let token = account::login(
        &state.pool,
        &req.email,
        &req.password,
        &state.config.jwt_secret,
        state.config.jwt_ttl_hours,
    )
    .await?;
    Ok(Json(LoginResponse { token }))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
) -> Result<Json<Profile>, ApiError> {
    let profile = account::profile(&state.pool, auth.account_id).await?;
    Ok(Json(profile))
}
