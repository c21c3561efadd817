//! Patient shopping cart.
//!
//! A cart is a pending, unpurchased stock reservation scoped to a single
//! pharmacy: the first item pins the pharmacy, and items from any other
//! pharmacy are rejected until the cart is emptied or submitted. Adding an
//! item already in the cart increments its quantity rather than duplicating
//! the row.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::{CartItem, CartLine};
use crate::error::ApiError;

/// One line of a bulk add request.
#[derive(Deserialize, Debug, Clone)]
pub struct BulkAdd {
    pub drug_id: Uuid,
    pub pharmacy_id: Uuid,
    pub quantity: i32,
}

/// Per-line outcome of a bulk add; one failing line never aborts the rest.
#[derive(Serialize, Debug)]
pub struct BulkOutcome {
    pub drug_id: Uuid,
    pub pharmacy_id: Uuid,
    pub added: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub total_cents: i64,
}

/// The single-pharmacy rule: an item may only join a cart that is empty or
/// already pinned to the same pharmacy.
fn single_pharmacy_conflict(existing: Option<Uuid>, requested: Uuid) -> bool {
    matches!(existing, Some(pinned) if pinned != requested)
}

async fn cart_pharmacy(pool: &PgPool, patient_id: Uuid) -> Result<Option<Uuid>, ApiError> {
    let pinned: Option<Uuid> =
        sqlx::query_scalar("SELECT pharmacy_id FROM cart_items WHERE patient_id = $1 LIMIT 1")
            .bind(patient_id)
            .fetch_optional(pool)
            .await?;
    Ok(pinned)
}

pub async fn view_cart(pool: &PgPool, patient_id: Uuid) -> Result<CartView, ApiError> {
    let items = sqlx::query_as::<_, CartLine>(
        "SELECT ci.drug_id, ci.pharmacy_id, d.name AS drug_name, ph.name AS pharmacy_name, \
                ci.quantity, pp.price_cents AS unit_price_cents, pp.quantity_available \
         FROM cart_items ci \
         JOIN pharmacy_products pp \
           ON pp.pharmacy_id = ci.pharmacy_id AND pp.drug_id = ci.drug_id \
         JOIN drugs d ON d.id = ci.drug_id \
         JOIN pharmacies ph ON ph.account_id = ci.pharmacy_id \
         WHERE ci.patient_id = $1 \
         ORDER BY ci.added_at",
    )
    .bind(patient_id)
    .fetch_all(pool)
    .await?;

    let total_cents = items
        .iter()
        .map(|line| i64::from(line.quantity) * line.unit_price_cents)
        .sum();

    Ok(CartView { items, total_cents })
}

pub async fn add_item(
    pool: &PgPool,
    patient_id: Uuid,
    drug_id: Uuid,
    pharmacy_id: Uuid,
    quantity: i32,
) -> Result<CartItem, ApiError> {
    if quantity <= 0 {
        return Err(ApiError::Validation(
            "Quantity must be positive".to_string(),
        ));
    }

    let available: Option<i32> = sqlx::query_scalar(
        "SELECT quantity_available FROM pharmacy_products WHERE pharmacy_id = $1 AND drug_id = $2",
    )
    .bind(pharmacy_id)
    .bind(drug_id)
    .fetch_optional(pool)
    .await?;
    let available =
        available.ok_or_else(|| ApiError::NotFound("This pharmacy does not list that drug".to_string()))?;

    if single_pharmacy_conflict(cart_pharmacy(pool, patient_id).await?, pharmacy_id) {
        return Err(ApiError::Conflict(
            "Cart already holds items from another pharmacy".to_string(),
        ));
    }

    // The stock check covers the combined quantity, not just the increment.
    let already_in_cart: Option<i32> = sqlx::query_scalar(
        "SELECT quantity FROM cart_items \
         WHERE patient_id = $1 AND drug_id = $2 AND pharmacy_id = $3",
    )
    .bind(patient_id)
    .bind(drug_id)
    .bind(pharmacy_id)
    .fetch_optional(pool)
    .await?;

    let requested_total = already_in_cart.unwrap_or(0) + quantity;
    if requested_total > available {
        return Err(ApiError::Conflict(format!(
            "Only {} units in stock",
            available
        )));
    }

    let item = sqlx::query_as::<_, CartItem>(
        "INSERT INTO cart_items (patient_id, drug_id, pharmacy_id, quantity) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (patient_id, drug_id, pharmacy_id) \
         DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity \
         RETURNING *",
    )
    .bind(patient_id)
    .bind(drug_id)
    .bind(pharmacy_id)
    .bind(quantity)
    .fetch_one(pool)
    .await?;

    Ok(item)
}

/// Bulk add with an itemized success/failure list.
pub async fn add_items(
    pool: &PgPool,
    patient_id: Uuid,
    lines: Vec<BulkAdd>,
) -> Result<Vec<BulkOutcome>, ApiError> {
    if lines.is_empty() {
        return Err(ApiError::Validation("No items to add".to_string()));
    }

    let mut outcomes = Vec::with_capacity(lines.len());
    for line in lines {
        let result = add_item(pool, patient_id, line.drug_id, line.pharmacy_id, line.quantity).await;
        outcomes.push(BulkOutcome {
            drug_id: line.drug_id,
            pharmacy_id: line.pharmacy_id,
            added: result.is_ok(),
            error: result.err().map(|e| e.to_string()),
        });
    }
    Ok(outcomes)
}

/// Sets an explicit quantity on an existing cart item.
pub async fn update_item(
    pool: &PgPool,
    patient_id: Uuid,
    drug_id: Uuid,
    pharmacy_id: Uuid,
    quantity: i32,
) -> Result<CartItem, ApiError> {
    if quantity <= 0 {
        return Err(ApiError::Validation(
            "Quantity must be positive; remove the item instead".to_string(),
        ));
    }

    let available: Option<i32> = sqlx::query_scalar(
        "SELECT quantity_available FROM pharmacy_products WHERE pharmacy_id = $1 AND drug_id = $2",
    )
    .bind(pharmacy_id)
    .bind(drug_id)
    .fetch_optional(pool)
    .await?;
    let available =
        available.ok_or_else(|| ApiError::NotFound("This pharmacy does not list that drug".to_string()))?;

    if quantity > available {
        return Err(ApiError::Conflict(format!(
            "Only {} units in stock",
            available
        )));
    }

    sqlx::query_as::<_, CartItem>(
        "UPDATE cart_items SET quantity = $4 \
         WHERE patient_id = $1 AND drug_id = $2 AND pharmacy_id = $3 \
         RETURNING *",
    )
    .bind(patient_id)
    .bind(drug_id)
    .bind(pharmacy_id)
    .bind(quantity)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::NotFound("Item is not in the cart".to_string()))
}

pub async fn remove_item(
    pool: &PgPool,
    patient_id: Uuid,
    drug_id: Uuid,
    pharmacy_id: Uuid,
) -> Result<(), ApiError> {
    let deleted = sqlx::query(
        "DELETE FROM cart_items WHERE patient_id = $1 AND drug_id = $2 AND pharmacy_id = $3",
    )
    .bind(patient_id)
    .bind(drug_id)
    .bind(pharmacy_id)
    .execute(pool)
    .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound("Item is not in the cart".to_string()));
    }
    Ok(())
}

pub async fn clear_cart(pool: &PgPool, patient_id: Uuid) -> Result<u64, ApiError> {
    let deleted = sqlx::query("DELETE FROM cart_items WHERE patient_id = $1")
        .bind(patient_id)
        .execute(pool)
        .await?;
    Ok(deleted.rows_affected())
}

/// Deletes cart items older than `max_age_days`. Called by the background
/// sweeper.
pub async fn sweep_stale(pool: &PgPool, max_age_days: i64) -> Result<u64, ApiError> {
    let deleted = sqlx::query(
        "DELETE FROM cart_items WHERE added_at < now() - make_interval(days => $1)",
    )
    .bind(i32::try_from(max_age_days).unwrap_or(i32::MAX))
    .execute(pool)
    .await?;
    Ok(deleted.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cart_accepts_any_pharmacy() {
        assert!(!single_pharmacy_conflict(None, Uuid::new_v4()));
    }

    #[test]
    fn pinned_cart_accepts_same_pharmacy() {
        let pharmacy = Uuid::new_v4();
        assert!(!single_pharmacy_conflict(Some(pharmacy), pharmacy));
    }

    #[test]
    fn pinned_cart_rejects_other_pharmacy() {
        assert!(single_pharmacy_conflict(Some(Uuid::new_v4()), Uuid::new_v4()));
    }
}
