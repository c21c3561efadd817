//! Patient favorite drugs. Adding an existing favorite is a no-op success.

use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::Drug;
use crate::error::ApiError;

pub async fn list_favorites(pool: &PgPool, patient_id: Uuid) -> Result<Vec<Drug>, ApiError> {
    let drugs = sqlx::query_as::<_, Drug>(
        "SELECT d.* FROM patient_favorite_drugs f \
         JOIN drugs d ON d.id = f.drug_id \
         WHERE f.patient_id = $1 \
         ORDER BY d.name",
    )
    .bind(patient_id)
    .fetch_all(pool)
    .await?;
    Ok(drugs)
}

pub async fn add_favorite(pool: &PgPool, patient_id: Uuid, drug_id: Uuid) -> Result<(), ApiError> {
    let drug_known: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM drugs WHERE id = $1)")
        .bind(drug_id)
        .fetch_one(pool)
        .await?;
    if !drug_known {
        return Err(ApiError::NotFound("Drug not found".to_string()));
    }

    sqlx::query(
        "INSERT INTO patient_favorite_drugs (patient_id, drug_id) VALUES ($1, $2) \
         ON CONFLICT (patient_id, drug_id) DO NOTHING",
    )
    .bind(patient_id)
    .bind(drug_id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn remove_favorite(
    pool: &PgPool,
    patient_id: Uuid,
    drug_id: Uuid,
) -> Result<(), ApiError> {
    let deleted =
        sqlx::query("DELETE FROM patient_favorite_drugs WHERE patient_id = $1 AND drug_id = $2")
            .bind(patient_id)
            .bind(drug_id)
            .execute(pool)
            .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound("Drug is not in favorites".to_string()));
    }
    Ok(())
}
