// src/store/postgres.rs

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, types::Json};
use uuid::Uuid;

use super::{DocumentStore, Filter, StoreError, unique_value, with_id};

/// PostgreSQL-backed store. All collections share the `documents` table
/// (see `migrations/`), with the payload held in a JSONB column.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Decode failures are malformed data and unique violations are conflicts;
/// every other failure is treated as transient.
fn map_sqlx(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Malformed(err.to_string())
        }
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(db.message().to_string())
        }
        other => {
            tracing::error!("Document store query failed: {:?}", other);
            StoreError::Unavailable(other.to_string())
        }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Value, StoreError> {
        let row: Option<(Json<Value>,)> =
            sqlx::query_as("SELECT data FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;

        row.map(|(Json(data),)| data)
            .ok_or_else(|| StoreError::not_found(collection, id))
    }

    async fn list(
        &self,
        collection: &str,
        filter: Option<&Filter>,
    ) -> Result<Vec<Value>, StoreError> {
        let rows: Vec<(Json<Value>,)> = match filter {
            Some(filter) => {
                sqlx::query_as(
                    r#"
                    SELECT data FROM documents
                    WHERE collection = $1 AND data -> $2 = $3
                    ORDER BY created_at, seq
                    "#,
                )
                .bind(collection)
                .bind(&filter.field)
                .bind(Json(&filter.value))
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as(
                    "SELECT data FROM documents WHERE collection = $1 ORDER BY created_at, seq",
                )
                .bind(collection)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(map_sqlx)?;

        Ok(rows.into_iter().map(|(Json(data),)| data).collect())
    }

    async fn create(&self, collection: &str, data: Value) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let document = with_id(data, &id)?;

        sqlx::query("INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(&id)
            .bind(Json(&document))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        Ok(id)
    }

    /// The `NOT EXISTS` guard covers any key; unique indexes (see
    /// `migrations/`) close the race for keys that need it, such as usernames.
    async fn create_unique(
        &self,
        collection: &str,
        key: &str,
        data: Value,
    ) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let document = with_id(data, &id)?;
        unique_value(&document, key)?;

        let result = sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data)
            SELECT $1, $2, $3::jsonb
            WHERE NOT EXISTS (
                SELECT 1 FROM documents
                WHERE collection = $1 AND data -> $4 = $3::jsonb -> $4
            )
            "#,
        )
        .bind(collection)
        .bind(&id)
        .bind(Json(&document))
        .bind(key)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "{} with this {} already exists",
                collection, key
            )));
        }
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError> {
        let document = with_id(data, id)?;

        let result = sqlx::query(
            "UPDATE documents SET data = $3, updated_at = NOW() WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(&document))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(collection, id));
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(collection, id));
        }
        Ok(())
    }
}
