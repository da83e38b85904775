use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use super::{Collection, DocumentId, DocumentStore, Query, RawDocument, StoreError};

/// SQL migration for the document table
const MIGRATION_001_DOCUMENTS: &str = include_str!("migrations/001_documents.sql");

/// SQLite-backed document store. Documents are JSON payloads in a single
/// table keyed by (collection, id); predicate evaluation happens in
/// [`Query::apply`], shared with every other backend.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given path.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(MIGRATION_001_DOCUMENTS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_path: &str) -> Result<Self, StoreError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let store = Self::connect(&db_url).await?;
        store.migrate().await?;
        Ok(store)
    }

    /// Open an existing database without creating it.
    pub async fn open(database_path: &str) -> Result<Self, StoreError> {
        let db_url = format!("sqlite:{}", database_path);
        let store = Self::connect(&db_url).await?;
        store.migrate().await?;
        Ok(store)
    }

    fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Result<RawDocument, StoreError> {
        let id_str: String = row.get("id");
        let data_str: String = row.get("data");

        Ok(RawDocument {
            id: Uuid::parse_str(&id_str).context("Invalid document ID")?,
            data: serde_json::from_str(&data_str)?,
        })
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn list(
        &self,
        collection: Collection,
        query: Query,
    ) -> Result<Vec<RawDocument>, StoreError> {
        let rows = sqlx::query("SELECT id, data FROM documents WHERE collection = ? ORDER BY rowid")
            .bind(collection.as_str())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list documents")?;

        let documents = rows
            .iter()
            .map(Self::row_to_document)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(query.apply(documents))
    }

    async fn get(
        &self,
        collection: Collection,
        id: DocumentId,
    ) -> Result<RawDocument, StoreError> {
        let row = sqlx::query("SELECT id, data FROM documents WHERE collection = ? AND id = ?")
            .bind(collection.as_str())
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch document")?;

        match row {
            Some(row) => Self::row_to_document(&row),
            None => Err(StoreError::NotFound { collection, id }),
        }
    }

    async fn create(
        &self,
        collection: Collection,
        data: Value,
    ) -> Result<RawDocument, StoreError> {
        let id = Uuid::new_v4();

        sqlx::query(
            "INSERT INTO documents (collection, id, data, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(collection.as_str())
        .bind(id.to_string())
        .bind(data.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to create document")?;

        debug!(%collection, %id, "document created");
        Ok(RawDocument { id, data })
    }

    async fn update(
        &self,
        collection: Collection,
        id: DocumentId,
        patch: Value,
    ) -> Result<RawDocument, StoreError> {
        let mut document = self.get(collection, id).await?;

        if let (Some(target), Some(fields)) = (document.data.as_object_mut(), patch.as_object()) {
            for (key, value) in fields {
                target.insert(key.clone(), value.clone());
            }
        }

        let result = sqlx::query("UPDATE documents SET data = ? WHERE collection = ? AND id = ?")
            .bind(document.data.to_string())
            .bind(collection.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update document")?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { collection, id });
        }

        debug!(%collection, %id, "document updated");
        Ok(document)
    }

    async fn delete(&self, collection: Collection, id: DocumentId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete document")?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { collection, id });
        }

        debug!(%collection, %id, "document deleted");
        Ok(())
    }
}
