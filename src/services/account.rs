//! Account registration, login and profile lookup.
//!
//! Registration writes the account row and its role profile in one
//! transaction. Admin accounts are seeded, never registered.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth;
use crate::db::models::{Account, Patient, Pharmacy, Role};
use crate::error::ApiError;
use crate::utils::normalize_email;

const MIN_PASSWORD_LEN: usize = 8;

pub struct NewPatient {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: String,
    pub address: String,
}

pub struct NewPharmacy {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: String,
    pub address: String,
}

/// An account with its role profile attached.
#[derive(Serialize, Debug)]
pub struct Profile {
    pub account: Account,
    pub patient: Option<Patient>,
    pub pharmacy: Option<Pharmacy>,
}

fn validate_credentials(email: &str, password: &str) -> Result<(), ApiError> {
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::Validation(
            "A valid email address is required".to_string(),
        ));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

async fn ensure_email_free(pool: &PgPool, email: &str) -> Result<(), ApiError> {
    let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE email = $1)")
        .bind(email)
        .fetch_one(pool)
        .await?;

    if taken {
        return Err(ApiError::Conflict(
            "An account with this email already exists".to_string(),
        ));
    }
    Ok(())
}

pub async fn register_patient(pool: &PgPool, input: NewPatient) -> Result<Account, ApiError> {
    let email = normalize_email(&input.email);
    validate_credentials(&email, &input.password)?;
    if input.full_name.trim().is_empty() {
        return Err(ApiError::Validation("Full name is required".to_string()));
    }
    ensure_email_free(pool, &email).await?;

    let password_hash = auth::hash_password(&input.password)?;
    let id = Uuid::new_v4();

    let mut tx = pool.begin().await?;

    let account = sqlx::query_as::<_, Account>(
        "INSERT INTO accounts (id, email, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(id)
    .bind(&email)
    .bind(&password_hash)
    .bind(Role::Patient.as_str())
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO patients (account_id, full_name, phone, address) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(input.full_name.trim())
        .bind(&input.phone)
        .bind(&input.address)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    log::info!("Registered patient account {}", id);
    Ok(account)
}

pub async fn register_pharmacy(pool: &PgPool, input: NewPharmacy) -> Result<Account, ApiError> {
    let email = normalize_email(&input.email);
    validate_credentials(&email, &input.password)?;
    if input.name.trim().is_empty() {
        return Err(ApiError::Validation(
            "Pharmacy name is required".to_string(),
        ));
    }
    ensure_email_free(pool, &email).await?;

    let password_hash = auth::hash_password(&input.password)?;
    let id = Uuid::new_v4();

    let mut tx = pool.begin().await?;

    let account = sqlx::query_as::<_, Account>(
        "INSERT INTO accounts (id, email, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(id)
    .bind(&email)
    .bind(&password_hash)
    .bind(Role::Pharmacy.as_str())
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO pharmacies (account_id, name, phone, address) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(input.name.trim())
        .bind(&input.phone)
        .bind(&input.address)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    log::info!("Registered pharmacy account {}", id);
    Ok(account)
}

/// Verifies credentials and issues a signed token. Unknown email and wrong
/// password are indistinguishable to the caller.
pub async fn login(
    pool: &PgPool,
    email: &str,
    password: &str,
    jwt_secret: &str,
    ttl_hours: i64,
) -> Result<String, ApiError> {
    let email = normalize_email(email);

    let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = $1")
        .bind(&email)
        .fetch_optional(pool)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if !auth::verify_password(password, &account.password_hash) {
        log::warn!("Failed login attempt for {}", email);
        return Err(ApiError::Unauthorized);
    }

    let role = Role::parse(&account.role).ok_or_else(|| {
        ApiError::Internal(format!(
            "Account {} has unknown role {}",
            account.id, account.role
        ))
    })?;

    auth::issue_token(account.id, role, jwt_secret, ttl_hours)
}

pub async fn profile(pool: &PgPool, account_id: Uuid) -> Result<Profile, ApiError> {
    let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
        .bind(account_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))?;

    let patient = sqlx::query_as::<_, Patient>("SELECT * FROM patients WHERE account_id = $1")
        .bind(account_id)
        .fetch_optional(pool)
        .await?;

    let pharmacy = sqlx::query_as::<_, Pharmacy>("SELECT * FROM pharmacies WHERE account_id = $1")
        .bind(account_id)
        .fetch_optional(pool)
        .await?;

    Ok(Profile {
        account,
        patient,
        pharmacy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_require_plausible_email() {
        assert!(validate_credentials("", "longenoughpw").is_err());
        assert!(validate_credentials("no-at-sign", "longenoughpw").is_err());
        assert!(validate_credentials("a@b.com", "longenoughpw").is_ok());
    }

    #[test]
    fn credentials_require_minimum_password_length() {
        assert!(matches!(
            validate_credentials("a@b.com", "short"),
            Err(ApiError::Validation(_))
        ));
        assert!(validate_credentials("a@b.com", "exactly8c").is_ok());
    }
}
