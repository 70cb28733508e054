// src/notebook/store.rs
//! Persistence for the notebook collections.
//!
//! Each collection is loaded and saved as a whole.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::RwLock;

use super::models::LabEntry;
use crate::error::ApiResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Entries,
    Templates,
}

impl Collection {
    pub fn key(&self) -> &'static str {
        match self {
            Collection::Entries => "lab_entries",
            Collection::Templates => "lab_templates",
        }
    }
}

#[async_trait]
pub trait NotebookStore: Send + Sync {
    /// A collection that was never saved loads as empty.
    async fn load(&self, collection: Collection) -> ApiResult<Vec<LabEntry>>;

    async fn save(&self, collection: Collection, entries: &[LabEntry]) -> ApiResult<()>;

    /// Whether the collection has ever been saved.
    async fn exists(&self, collection: Collection) -> ApiResult<bool>;
}

// ==================== SQLITE ====================

pub struct SqliteNotebookStore {
    pool: SqlitePool,
}

impl SqliteNotebookStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotebookStore for SqliteNotebookStore {
    async fn load(&self, collection: Collection) -> ApiResult<Vec<LabEntry>> {
        let payload: Option<String> =
            sqlx::query_scalar("SELECT payload FROM notebook_collections WHERE name = ?")
                .bind(collection.key())
                .fetch_optional(&self.pool)
                .await?;

        match payload {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    async fn save(&self, collection: Collection, entries: &[LabEntry]) -> ApiResult<()> {
        let payload = serde_json::to_string(entries)?;

        sqlx::query(
            r#"INSERT INTO notebook_collections (name, payload, updated_at)
               VALUES (?, ?, ?)
               ON CONFLICT(name) DO UPDATE SET
                   payload = excluded.payload,
                   updated_at = excluded.updated_at"#,
        )
            .bind(collection.key())
            .bind(&payload)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        log::debug!("Saved {} ({} records)", collection.key(), entries.len());
        Ok(())
    }

    async fn exists(&self, collection: Collection) -> ApiResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notebook_collections WHERE name = ?")
            .bind(collection.key())
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }
}

// ==================== IN-MEMORY ====================

#[derive(Default)]
pub struct MemoryNotebookStore {
    collections: RwLock<HashMap<Collection, Vec<LabEntry>>>,
}

impl MemoryNotebookStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotebookStore for MemoryNotebookStore {
    async fn load(&self, collection: Collection) -> ApiResult<Vec<LabEntry>> {
        Ok(self
            .collections
            .read()
            .await
            .get(&collection)
            .cloned()
            .unwrap_or_default())
    }

    async fn save(&self, collection: Collection, entries: &[LabEntry]) -> ApiResult<()> {
        self.collections
            .write()
            .await
            .insert(collection, entries.to_vec());
        Ok(())
    }

    async fn exists(&self, collection: Collection) -> ApiResult<bool> {
        Ok(self.collections.read().await.contains_key(&collection))
    }
}
