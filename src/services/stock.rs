//! Per-pharmacy stock listings. Only the owning pharmacy may mutate its
//! rows; the ownership check happens at the handler via claims, so every
//! function here takes the caller's pharmacy id.

use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::{PharmacyProduct, StockLine};
use crate::error::ApiError;

pub struct UpsertListing {
    pub drug_id: Uuid,
    pub price_cents: i64,
    pub quantity_available: i32,
}

pub async fn list_stock(pool: &PgPool, pharmacy_id: Uuid) -> Result<Vec<StockLine>, ApiError> {
    let known: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pharmacies WHERE account_id = $1)")
            .bind(pharmacy_id)
            .fetch_one(pool)
            .await?;
    if !known {
        return Err(ApiError::NotFound("Pharmacy not found".to_string()));
    }

    let lines = sqlx::query_as::<_, StockLine>(
        "SELECT pp.drug_id, d.name AS drug_name, pp.price_cents, pp.quantity_available \
         FROM pharmacy_products pp \
         JOIN drugs d ON d.id = pp.drug_id \
         WHERE pp.pharmacy_id = $1 \
         ORDER BY d.name",
    )
    .bind(pharmacy_id)
    .fetch_all(pool)
    .await?;

    Ok(lines)
}

/// Insert or update the composite-keyed listing row.
pub async fn upsert_listing(
    pool: &PgPool,
    pharmacy_id: Uuid,
    input: UpsertListing,
) -> Result<PharmacyProduct, ApiError> {
    if input.price_cents <= 0 {
        return Err(ApiError::Validation("Price must be positive".to_string()));
    }
    if input.quantity_available < 0 {
        return Err(ApiError::Validation(
            "Quantity cannot be negative".to_string(),
        ));
    }

    let drug_known: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM drugs WHERE id = $1)")
        .bind(input.drug_id)
        .fetch_one(pool)
        .await?;
    if !drug_known {
        return Err(ApiError::NotFound("Drug not found".to_string()));
    }

    let listing = sqlx::query_as::<_, PharmacyProduct>(
        "INSERT INTO pharmacy_products (pharmacy_id, drug_id, price_cents, quantity_available) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (pharmacy_id, drug_id) \
         DO UPDATE SET price_cents = EXCLUDED.price_cents, \
                       quantity_available = EXCLUDED.quantity_available \
         RETURNING *",
    )
    .bind(pharmacy_id)
    .bind(input.drug_id)
    .bind(input.price_cents)
    .bind(input.quantity_available)
    .fetch_one(pool)
    .await?;

    log::info!(
        "Pharmacy {} listed drug {} at {} cents ({} units)",
        pharmacy_id,
        input.drug_id,
        listing.price_cents,
        listing.quantity_available
    );
    Ok(listing)
}

/// Relative stock adjustment. A delta that would take the quantity below
/// zero is rejected and the row is left unchanged.
pub async fn adjust_quantity(
    pool: &PgPool,
    pharmacy_id: Uuid,
    drug_id: Uuid,
    delta: i32,
) -> Result<PharmacyProduct, ApiError> {
    if delta == 0 {
        return Err(ApiError::Validation(
            "Adjustment delta cannot be zero".to_string(),
        ));
    }

    let updated = sqlx::query_as::<_, PharmacyProduct>(
        "UPDATE pharmacy_products \
         SET quantity_available = quantity_available + $3 \
         WHERE pharmacy_id = $1 AND drug_id = $2 AND quantity_available + $3 >= 0 \
         RETURNING *",
    )
    .bind(pharmacy_id)
    .bind(drug_id)
    .bind(delta)
    .fetch_optional(pool)
    .await?;

    match updated {
        Some(listing) => Ok(listing),
        None => {
            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM pharmacy_products WHERE pharmacy_id = $1 AND drug_id = $2)",
            )
            .bind(pharmacy_id)
            .bind(drug_id)
            .fetch_one(pool)
            .await?;

            if exists {
                Err(ApiError::Conflict(
                    "Stock cannot be decreased below zero".to_string(),
                ))
            } else {
                Err(ApiError::NotFound("Listing not found".to_string()))
            }
        }
    }
}

/// Removes a listing. Cart items referencing it are dropped by the
/// cascading foreign key.
pub async fn remove_listing(
    pool: &PgPool,
    pharmacy_id: Uuid,
    drug_id: Uuid,
) -> Result<(), ApiError> {
    let deleted = sqlx::query(
        "DELETE FROM pharmacy_products WHERE pharmacy_id = $1 AND drug_id = $2",
    )
    .bind(pharmacy_id)
    .bind(drug_id)
    .execute(pool)
    .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound("Listing not found".to_string()));
    }

    log::info!("Pharmacy {} delisted drug {}", pharmacy_id, drug_id);
    Ok(())
}
