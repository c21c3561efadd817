use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Json};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::AuthAccount;
use crate::db::models::Role;
use crate::error::ApiError;
use crate::services::payment::{self, CheckoutSession};
use crate::state::AppState;

pub async fn checkout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<CheckoutSession>, ApiError> {
    let patient_id = auth.require_role(Role::Patient)?;
    let session = payment::create_checkout(&state, patient_id, order_id).await?;
    Ok(Json(session))
}

/// Stripe webhook endpoint. Authenticated by the `Stripe-Signature` header
/// rather than a bearer token.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    payment::verify_signature(
        &body,
        signature,
        &state.config.stripe_webhook_secret,
        Utc::now().timestamp(),
    )?;

    payment::handle_webhook(&state.pool, &body).await?;
    Ok(StatusCode::OK)
}
