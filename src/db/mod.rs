use sqlx::{postgres::PgPoolOptions, Executor, PgPool};
use thiserror::Error;

pub mod models;

const SCHEMA_SQL: &str = include_str!("schema.sql");

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to parse database URL: {0}")]
    UrlParse(String),
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Failed to create database: {0}")]
    CreateDb(String),
}

/// Connects to the configured database, creating it and applying the schema
/// if missing.
pub async fn init_db(database_url: &str) -> Result<PgPool, DatabaseError> {
    let (base_url, db_name) = parse_database_url(database_url)?;

    let temp_pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&base_url)
        .await
        .map_err(DatabaseError::Sqlx)?;

    ensure_database_exists(&temp_pool, &db_name).await?;

    let pool = PgPool::connect(database_url)
        .await
        .map_err(DatabaseError::Sqlx)?;

    apply_schema(&pool).await?;

    Ok(pool)
}

fn parse_database_url(database_url: &str) -> Result<(String, String), DatabaseError> {
    let base_url = database_url
        .rsplit_once('/')
        .ok_or_else(|| DatabaseError::UrlParse("Invalid database URL format".to_string()))?
        .0
        .to_string();

    let db_name = database_url
        .split('/')
        .next_back()
        .and_then(|s| s.split('?').next())
        .ok_or_else(|| DatabaseError::UrlParse("Failed to extract database name".to_string()))?
        .to_string();

    Ok((base_url, db_name))
}

async fn ensure_database_exists(pool: &PgPool, db_name: &str) -> Result<(), DatabaseError> {
    let db_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(db_name)
            .fetch_one(pool)
            .await
            .map_err(DatabaseError::Sqlx)?;

    if !db_exists {
        pool.execute(format!("CREATE DATABASE {}", db_name).as_str())
            .await
            .map_err(|e| DatabaseError::CreateDb(e.to_string()))?;
    }

    Ok(())
}

/// Applies the embedded schema. Every statement is idempotent
/// (CREATE ... IF NOT EXISTS), so this runs on each startup.
async fn apply_schema(pool: &PgPool) -> Result<(), DatabaseError> {
    sqlx::raw_sql(SCHEMA_SQL)
        .execute(pool)
        .await
        .map_err(DatabaseError::Sqlx)?;
    log::info!("Database schema is up to date");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_database_url_splits_base_and_name() {
        let (base, name) =
            parse_database_url("postgres://user:pw@localhost:5432/pharmamart").expect("valid URL");
        assert_eq!(base, "postgres://user:pw@localhost:5432");
        assert_eq!(name, "pharmamart");
    }

    #[test]
    fn parse_database_url_strips_query_params() {
        let (_, name) =
            parse_database_url("postgres://localhost/pharmamart?sslmode=disable").unwrap();
        assert_eq!(name, "pharmamart");
    }

    #[test]
    fn parse_database_url_rejects_garbage() {
        assert!(parse_database_url("not-a-url").is_err());
    }
}
