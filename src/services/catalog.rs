//! Admin-managed drug catalog. Reads are open to every authenticated role.

use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::{Drug, DrugOffer};
use crate::error::ApiError;

pub struct CreateDrug {
    pub name: String,
    pub description: String,
    pub category: String,
}

pub struct UpdateDrug {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

pub async fn list_drugs(pool: &PgPool, search: Option<&str>) -> Result<Vec<Drug>, ApiError> {
    let drugs = match search.map(str::trim).filter(|s| !s.is_empty()) {
        Some(term) => {
            let pattern = format!("%{}%", term);
            sqlx::query_as::<_, Drug>(
                "SELECT * FROM drugs WHERE name ILIKE $1 OR category ILIKE $1 ORDER BY name",
            )
            .bind(pattern)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Drug>("SELECT * FROM drugs ORDER BY name")
                .fetch_all(pool)
                .await?
        }
    };
    Ok(drugs)
}

pub async fn get_drug(pool: &PgPool, id: Uuid) -> Result<Drug, ApiError> {
    sqlx::query_as::<_, Drug>("SELECT * FROM drugs WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("Drug not found".to_string()))
}

pub async fn create_drug(pool: &PgPool, input: CreateDrug) -> Result<Drug, ApiError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("Drug name is required".to_string()));
    }
    ensure_name_free(pool, name, None).await?;

    let drug = sqlx::query_as::<_, Drug>(
        "INSERT INTO drugs (id, name, description, category) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(input.description.trim())
    .bind(input.category.trim())
    .fetch_one(pool)
    .await?;

    log::info!("Catalog: added drug {} ({})", drug.name, drug.id);
    Ok(drug)
}

pub async fn update_drug(pool: &PgPool, id: Uuid, input: UpdateDrug) -> Result<Drug, ApiError> {
    let name = match &input.name {
        Some(name) => {
            let name = name.trim();
            if name.is_empty() {
                return Err(ApiError::Validation("Drug name cannot be empty".to_string()));
            }
            ensure_name_free(pool, name, Some(id)).await?;
            Some(name.to_string())
        }
        None => None,
    };

    sqlx::query_as::<_, Drug>(
        "UPDATE drugs SET name = COALESCE($2, name), description = COALESCE($3, description), \
         category = COALESCE($4, category) WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(name)
    .bind(input.description)
    .bind(input.category)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::NotFound("Drug not found".to_string()))
}

/// Deleting a drug that listings or past orders still reference is a
/// conflict, not a cascade.
pub async fn delete_drug(pool: &PgPool, id: Uuid) -> Result<(), ApiError> {
    let referenced: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM pharmacy_products WHERE drug_id = $1) \
         OR EXISTS(SELECT 1 FROM order_details WHERE drug_id = $1)",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;

    if referenced {
        return Err(ApiError::Conflict(
            "Drug is referenced by pharmacy listings or orders".to_string(),
        ));
    }

    let deleted = sqlx::query("DELETE FROM drugs WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound("Drug not found".to_string()));
    }

    log::info!("Catalog: removed drug {}", id);
    Ok(())
}

/// All pharmacy offers for a drug, cheapest first.
pub async fn drug_offers(pool: &PgPool, drug_id: Uuid) -> Result<Vec<DrugOffer>, ApiError> {
    get_drug(pool, drug_id).await?;

    let offers = sqlx::query_as::<_, DrugOffer>(
        "SELECT pp.pharmacy_id, ph.name AS pharmacy_name, pp.price_cents, pp.quantity_available \
         FROM pharmacy_products pp \
         JOIN pharmacies ph ON ph.account_id = pp.pharmacy_id \
         WHERE pp.drug_id = $1 \
         ORDER BY pp.price_cents",
    )
    .bind(drug_id)
    .fetch_all(pool)
    .await?;

    Ok(offers)
}

async fn ensure_name_free(pool: &PgPool, name: &str, except: Option<Uuid>) -> Result<(), ApiError> {
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM drugs WHERE lower(name) = lower($1) AND id IS DISTINCT FROM $2)",
    )
    .bind(name)
    .bind(except)
    .fetch_one(pool)
    .await?;

    if taken {
        return Err(ApiError::Conflict(format!(
            "A drug named {} already exists",
            name
        )));
    }
    Ok(())
}
