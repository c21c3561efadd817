//! JWT bearer authentication and password hashing.
//!
//! `require_auth` is the router middleware: it extracts the bearer token,
//! verifies the signature and expiry, and injects an [`AuthAccount`] into
//! request extensions for downstream handlers. Role checks happen in the
//! handlers themselves, before any database work.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::Role;
use crate::error::ApiError;
use crate::state::AppState;

/// JWT claim set: account id, role, issued-at and expiry.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// The authenticated caller, injected into request extensions by
/// [`require_auth`].
#[derive(Debug, Clone, Copy)]
pub struct AuthAccount {
    pub account_id: Uuid,
    pub role: Role,
}

impl AuthAccount {
    /// Returns the account id if the caller holds `role`, otherwise Forbidden.
    pub fn require_role(&self, role: Role) -> Result<Uuid, ApiError> {
        if self.role == role {
            Ok(self.account_id)
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

pub fn issue_token(
    account_id: Uuid,
    role: Role,
    secret: &str,
    ttl_hours: i64,
) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
        sub: account_id,
        role: role.as_str().to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::hours(ttl_hours)).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("Failed to sign token: {}", e)))
}

/// Verifies signature and expiry; any failure is Unauthorized.
pub fn verify_token(token: &str, secret: &str) -> Result<AuthAccount, ApiError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized)?;

    let role = Role::parse(&data.claims.role).ok_or(ApiError::Unauthorized)?;

    Ok(AuthAccount {
        account_id: data.claims.sub,
        role,
    })
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Require a valid bearer token on every protected route.
///
/// Reads `AppState` from request extensions (injected as the outermost
/// Extension layer) for the JWT secret.
pub async fn require_auth(req: Request, next: Next) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let state = req
        .extensions()
        .get::<AppState>()
        .cloned()
        .ok_or_else(|| ApiError::Internal("Missing application state".to_string()))?;

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let account = verify_token(token, &state.config.jwt_secret)?;

    req.extensions_mut().insert(account);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn token_round_trip_preserves_identity() {
        let id = Uuid::new_v4();
        let token = issue_token(id, Role::Patient, SECRET, 1).unwrap();
        let account = verify_token(&token, SECRET).unwrap();
        assert_eq!(account.account_id, id);
        assert_eq!(account.role, Role::Patient);
    }

    #[test]
    fn token_with_wrong_secret_is_rejected() {
        let token = issue_token(Uuid::new_v4(), Role::Admin, SECRET, 1).unwrap();
        assert!(matches!(
            verify_token(&token, "other-secret"),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        // Negative TTL puts the expiry well past the default leeway.
        let token = issue_token(Uuid::new_v4(), Role::Patient, SECRET, -2).unwrap();
        assert!(matches!(
            verify_token(&token, SECRET),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(matches!(
            verify_token("not.a.jwt", SECRET),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn password_verify_accepts_original_and_rejects_wrong() {
        let hash = hash_password("hunter2hunter2").unwrap();
        assert!(verify_password("hunter2hunter2", &hash));
        assert!(!verify_password("password123", &hash));
        assert!(!verify_password("hunter2hunter2", "not-a-phc-string"));
    }

    #[test]
    fn require_role_checks_the_caller() {
        let account = AuthAccount {
            account_id: Uuid::new_v4(),
            role: Role::Pharmacy,
        };
        assert_eq!(
            account.require_role(Role::Pharmacy).unwrap(),
            account.account_id
        );
        assert!(matches!(
            account.require_role(Role::Admin),
            Err(ApiError::Forbidden)
        ));
    }
}
