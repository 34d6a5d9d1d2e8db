//! `PostgreSQL` implementation of [`RecordStore`].
//!
//! Each table has the shape `(key TEXT PRIMARY KEY, data JSONB, created_at,
//! updated_at)`. Queries are built at runtime since the table name varies;
//! it always comes from the [`Table`] allowlist, never from request input.

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{Filter, RecordStore, RepositoryError, Table};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    data: Value,
}

/// Map a violated unique index (such as the email indexes) to a conflict.
fn unique_violation_as_conflict(err: sqlx::Error, table: Table, key: &str) -> RepositoryError {
    match err.as_database_error() {
        Some(db) if db.is_unique_violation() => RepositoryError::Conflict(format!(
            "{table} record {key} collides with an existing record"
        )),
        _ => RepositoryError::Database(err),
    }
}

// =============================================================================
// Store
// =============================================================================

/// Record store backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Borrow the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn create_document(
        &self,
        table: Table,
        key: &str,
        document: Value,
    ) -> Result<(), RepositoryError> {
        let sql = format!(
            "INSERT INTO {table} (key, data) VALUES ($1, $2) ON CONFLICT (key) DO NOTHING"
        );
        let result = sqlx::query(&sql)
            .bind(key)
            .bind(document)
            .execute(&self.pool)
            .await
            .map_err(|e| unique_violation_as_conflict(e, table, key))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "{table} record {key} already exists"
            )));
        }
        Ok(())
    }

    async fn read_document(&self, table: Table, key: &str) -> Result<Option<Value>, RepositoryError> {
        let sql = format!("SELECT data FROM {table} WHERE key = $1");
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.data))
    }

    async fn update_document(
        &self,
        table: Table,
        key: &str,
        patch: Value,
    ) -> Result<Value, RepositoryError> {
        if !patch.is_object() {
            return Err(RepositoryError::DataCorruption(
                "patches must be JSON objects".to_string(),
            ));
        }

        // jsonb `||` is a shallow merge, same as MemoryRecordStore.
        let sql = format!(
            "UPDATE {table} SET data = data || $2, updated_at = now() WHERE key = $1 RETURNING data"
        );
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(key)
            .bind(patch)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| unique_violation_as_conflict(e, table, key))?;
        row.map(|r| r.data).ok_or(RepositoryError::NotFound)
    }

    async fn delete_document(&self, table: Table, key: &str) -> Result<(), RepositoryError> {
        let sql = format!("DELETE FROM {table} WHERE key = $1");
        let result = sqlx::query(&sql).bind(key).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_documents(
        &self,
        table: Table,
        filters: &[Filter],
    ) -> Result<Vec<Value>, RepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT data FROM {table}"));

        for (index, filter) in filters.iter().enumerate() {
            query.push(if index == 0 { " WHERE " } else { " AND " });
            match filter {
                Filter::Eq { field, value } => {
                    let mut containment = serde_json::Map::new();
                    containment.insert(field.clone(), value.clone());
                    query.push("data @> ").push_bind(Value::Object(containment));
                }
                Filter::NotBlank { field } => {
                    query
                        .push("coalesce(btrim(data ->> ")
                        .push_bind(field.clone())
                        .push("), '') <> ''");
                }
            }
        }
        query.push(" ORDER BY created_at, key");

        let rows: Vec<DocumentRow> = query.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|r| r.data).collect())
    }
}

impl RecordStore for PgRecordStore {
    fn create<'a>(
        &'a self,
        table: Table,
        key: &'a str,
        document: Value,
    ) -> BoxFuture<'a, Result<(), RepositoryError>> {
        self.create_document(table, key, document).boxed()
    }

    fn read<'a>(
        &'a self,
        table: Table,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Option<Value>, RepositoryError>> {
        self.read_document(table, key).boxed()
    }

    fn update<'a>(
        &'a self,
        table: Table,
        key: &'a str,
        patch: Value,
    ) -> BoxFuture<'a, Result<Value, RepositoryError>> {
        self.update_document(table, key, patch).boxed()
    }

    fn delete<'a>(
        &'a self,
        table: Table,
        key: &'a str,
    ) -> BoxFuture<'a, Result<(), RepositoryError>> {
        self.delete_document(table, key).boxed()
    }

    fn list<'a>(
        &'a self,
        table: Table,
        filters: &'a [Filter],
    ) -> BoxFuture<'a, Result<Vec<Value>, RepositoryError>> {
        self.list_documents(table, filters).boxed()
    }

    fn ping(&self) -> BoxFuture<'_, Result<(), RepositoryError>> {
        async move {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        }
        .boxed()
    }
}
