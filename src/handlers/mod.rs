pub mod account;
pub mod cart;
pub mod catalog;
pub mod favorites;
pub mod order;
pub mod payment;
pub mod stock;

use axum::Json;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
