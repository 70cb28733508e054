// src/db.rs - Database setup and migrations

use anyhow::Result;
use sqlx::{sqlite::SqliteConnectOptions, sqlite::SqlitePoolOptions, SqlitePool};
use std::str::FromStr;
use std::time::Duration;

use crate::config::DatabaseConfig;

pub async fn create_pool(db_config: &DatabaseConfig) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&db_config.url)?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(db_config.max_connections)
        .min_connections(db_config.min_connections)
        .acquire_timeout(Duration::from_secs(db_config.connect_timeout))
        .connect_with(options)
        .await?;

    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(pool)
        .await?;

    // One JSON document per notebook collection (entries, templates)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notebook_collections (
            name TEXT PRIMARY KEY CHECK(name IN ('lab_entries', 'lab_templates')),
            payload TEXT NOT NULL CHECK(json_valid(payload)),
            updated_at DATETIME NOT NULL
        )
        "#,
    )
        .execute(pool)
        .await?;

    log::info!("Database migrations completed");
    Ok(())
}

/// Single-connection in-memory database with the schema applied.
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    run_migrations(&pool).await.expect("migrations");
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_rt::test]
    async fn test_migrations_are_idempotent() {
        let pool = test_pool().await;
        run_migrations(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notebook_collections")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[actix_rt::test]
    async fn test_unknown_collection_is_rejected() {
        let pool = test_pool().await;
        let result = sqlx::query(
            "INSERT INTO notebook_collections (name, payload, updated_at) VALUES ('chemicals', '[]', datetime('now'))",
        )
            .execute(&pool)
            .await;
        assert!(result.is_err());
    }
}
