//! Stripe Checkout integration: session creation for approved orders and
//! the signed webhook that captures payment.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::{Order, OrderLine, OrderStatus};
use crate::error::ApiError;
use crate::services::order;
use crate::state::AppState;

const STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Stripe rejects events older than this; we mirror the same tolerance on
/// the signature timestamp.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Serialize, Debug)]
pub struct CheckoutSession {
    pub order_id: Uuid,
    pub session_id: String,
    pub url: String,
}

#[derive(Deserialize)]
struct StripeSession {
    id: String,
    url: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookData,
}

#[derive(Deserialize, Debug)]
pub struct WebhookData {
    pub object: WebhookObject,
}

#[derive(Deserialize, Debug)]
pub struct WebhookObject {
    pub id: String,
}

/// Creates a Checkout Session for an approved, unpaid order owned by the
/// caller, and stores the session id on the order.
pub async fn create_checkout(
    state: &AppState,
    patient_id: Uuid,
    order_id: Uuid,
) -> Result<CheckoutSession, ApiError> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

    if order.patient_id != patient_id {
        return Err(ApiError::Forbidden);
    }
    if OrderStatus::parse(&order.status) != Some(OrderStatus::Approved) {
        return Err(ApiError::Conflict(format!(
            "Order must be approved before checkout (currently {})",
            order.status
        )));
    }

    let lines = sqlx::query_as::<_, OrderLine>(
        "SELECT od.drug_id, d.name AS drug_name, od.quantity, od.unit_price_cents \
         FROM order_details od \
         JOIN drugs d ON d.id = od.drug_id \
         WHERE od.order_id = $1",
    )
    .bind(order_id)
    .fetch_all(&state.pool)
    .await?;

    let form = checkout_form(&state.config.checkout_success_url, &state.config.checkout_cancel_url, order_id, &lines);

    let response = state
        .http
        .post(format!("{}/v1/checkout/sessions", STRIPE_API_BASE))
        .bearer_auth(&state.config.stripe_secret_key)
        .form(&form)
        .send()
        .await
        .map_err(|e| ApiError::Internal(format!("Stripe request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Internal(format!(
            "Stripe returned {}: {}",
            status, body
        )));
    }

    let session: StripeSession = response
        .json()
        .await
        .map_err(|e| ApiError::Internal(format!("Malformed Stripe response: {}", e)))?;
    let url = session
        .url
        .ok_or_else(|| ApiError::Internal("Stripe session has no redirect URL".to_string()))?;

    sqlx::query("UPDATE orders SET stripe_session_id = $2, updated_at = now() WHERE id = $1")
        .bind(order_id)
        .bind(&session.id)
        .execute(&state.pool)
        .await?;

    log::info!("Checkout session {} opened for order {}", session.id, order_id);

    Ok(CheckoutSession {
        order_id,
        session_id: session.id,
        url,
    })
}

fn checkout_form(
    success_url: &str,
    cancel_url: &str,
    order_id: Uuid,
    lines: &[OrderLine],
) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), success_url.to_string()),
        ("cancel_url".to_string(), cancel_url.to_string()),
        ("client_reference_id".to_string(), order_id.to_string()),
        ("metadata[order_id]".to_string(), order_id.to_string()),
    ];

    for (i, line) in lines.iter().enumerate() {
        form.push((
            format!("line_items[{}][quantity]", i),
            line.quantity.to_string(),
        ));
        form.push((
            format!("line_items[{}][price_data][currency]", i),
            "usd".to_string(),
        ));
        form.push((
            format!("line_items[{}][price_data][unit_amount]", i),
            line.unit_price_cents.to_string(),
        ));
        form.push((
            format!("line_items[{}][price_data][product_data][name]", i),
            line.drug_name.clone(),
        ));
    }

    form
}

/// Verifies a `Stripe-Signature` header (`t=...,v1=...`) against the raw
/// payload. The signed message is `"{t}.{payload}"`.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), ApiError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(ApiError::Unauthorized)?;
    if signatures.is_empty() {
        return Err(ApiError::Unauthorized);
    }
    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(ApiError::Unauthorized);
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| ApiError::Internal(format!("Invalid webhook secret: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    if signatures.iter().any(|sig| *sig == expected) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

/// Applies a verified webhook event. Events for unknown or already-settled
/// sessions are acknowledged without effect.
pub async fn handle_webhook(pool: &PgPool, payload: &[u8]) -> Result<(), ApiError> {
    let event: WebhookEvent = serde_json::from_slice(payload)
        .map_err(|e| ApiError::Validation(format!("Malformed webhook payload: {}", e)))?;

    if event.event_type == "checkout.session.completed" {
        match order::mark_paid(pool, &event.data.object.id).await? {
            Some(order) => log::info!("Order {} paid via session {}", order.id, event.data.object.id),
            None => log::warn!(
                "Webhook for unknown or already-settled session {}",
                event.data.object.id
            ),
        }
    } else {
        log::debug!("Ignoring webhook event type {}", event.event_type);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";

    fn sign(payload: &[u8], timestamp: i64, secret: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn valid_signature_is_accepted() {
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let header = sign(payload, 1_700_000_000, SECRET);
        assert!(verify_signature(payload, &header, SECRET, 1_700_000_000).is_ok());
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let payload = b"{}";
        let header = sign(payload, 1_700_000_000, SECRET);
        let now = 1_700_000_000 + SIGNATURE_TOLERANCE_SECS + 1;
        assert!(verify_signature(payload, &header, SECRET, now).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let payload = b"{}";
        let header = sign(payload, 1_700_000_000, "whsec_other");
        assert!(verify_signature(payload, &header, SECRET, 1_700_000_000).is_err());
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let header = sign(b"original", 1_700_000_000, SECRET);
        assert!(verify_signature(b"tampered", &header, SECRET, 1_700_000_000).is_err());
    }

    #[test]
    fn malformed_header_is_rejected() {
        assert!(verify_signature(b"{}", "no-timestamp-here", SECRET, 0).is_err());
        assert!(verify_signature(b"{}", "t=123", SECRET, 123).is_err());
    }

    #[test]
    fn webhook_event_parses_session_id() {
        let payload = r#"{
            "id": "evt_123",
            "type": "checkout.session.completed",
            "data": {"object": {"id": "cs_test_abc", "amount_total": 1250}}
        }"#;
        let event: WebhookEvent = serde_json::from_str(payload).unwrap();
        assert_eq!(event.event_type, "checkout.session.completed");
        assert_eq!(event.data.object.id, "cs_test_abc");
    }

    #[test]
    fn checkout_form_carries_one_line_item_per_detail() {
        let lines = vec![
            OrderLine {
                drug_id: Uuid::new_v4(),
                drug_name: "Aspirin".to_string(),
                quantity: 2,
                unit_price_cents: 499,
            },
            OrderLine {
                drug_id: Uuid::new_v4(),
                drug_name: "Metformin".to_string(),
                quantity: 1,
                unit_price_cents: 1250,
            },
        ];
        let order_id = Uuid::new_v4();
        let form = checkout_form("http://s", "http://c", order_id, &lines);

        let get = |key: &str| {
            form.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
                .unwrap()
        };
        assert_eq!(get("mode"), "payment");
        assert_eq!(get("metadata[order_id]"), order_id.to_string());
        assert_eq!(get("line_items[0][price_data][unit_amount]"), "499");
        assert_eq!(get("line_items[1][quantity]"), "1");
        assert_eq!(
            get("line_items[1][price_data][product_data][name]"),
            "Metformin"
        );
    }
}
