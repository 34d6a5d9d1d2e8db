//! In-memory implementation of [`RecordStore`].
//!
//! Used by tests and local tooling. Documents keep insertion order so that
//! `list` returns them oldest first, like the `PostgreSQL` store.

use std::collections::HashMap;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{Filter, RecordStore, RepositoryError, Table, merge_into};

/// Record store holding every table in process memory.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    tables: RwLock<HashMap<Table, Vec<(String, Value)>>>,
}

impl MemoryRecordStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in `table`.
    pub async fn count(&self, table: Table) -> usize {
        self.tables.read().await.get(&table).map_or(0, Vec::len)
    }
}

impl RecordStore for MemoryRecordStore {
    fn create<'a>(
        &'a self,
        table: Table,
        key: &'a str,
        document: Value,
    ) -> BoxFuture<'a, Result<(), RepositoryError>> {
        async move {
            if !document.is_object() {
                return Err(RepositoryError::DataCorruption(
                    "documents must be JSON objects".to_string(),
                ));
            }
            let mut tables = self.tables.write().await;
            let rows = tables.entry(table).or_default();
            if rows.iter().any(|(k, _)| k == key) {
                return Err(RepositoryError::Conflict(format!(
                    "{table} record {key} already exists"
                )));
            }
            rows.push((key.to_string(), document));
            Ok(())
        }
        .boxed()
    }

    fn read<'a>(
        &'a self,
        table: Table,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Option<Value>, RepositoryError>> {
        async move {
            let tables = self.tables.read().await;
            Ok(tables
                .get(&table)
                .and_then(|rows| rows.iter().find(|(k, _)| k == key))
                .map(|(_, doc)| doc.clone()))
        }
        .boxed()
    }

    fn update<'a>(
        &'a self,
        table: Table,
        key: &'a str,
        patch: Value,
    ) -> BoxFuture<'a, Result<Value, RepositoryError>> {
        async move {
            let mut tables = self.tables.write().await;
            let document = tables
                .get_mut(&table)
                .and_then(|rows| rows.iter_mut().find(|(k, _)| k == key))
                .map(|(_, doc)| doc)
                .ok_or(RepositoryError::NotFound)?;
            merge_into(document, patch)?;
            Ok(document.clone())
        }
        .boxed()
    }

    fn delete<'a>(
        &'a self,
        table: Table,
        key: &'a str,
    ) -> BoxFuture<'a, Result<(), RepositoryError>> {
        async move {
            let mut tables = self.tables.write().await;
            let rows = tables.get_mut(&table).ok_or(RepositoryError::NotFound)?;
            let position = rows
                .iter()
                .position(|(k, _)| k == key)
                .ok_or(RepositoryError::NotFound)?;
            rows.remove(position);
            Ok(())
        }
        .boxed()
    }

    fn list<'a>(
        &'a self,
        table: Table,
        filters: &'a [Filter],
    ) -> BoxFuture<'a, Result<Vec<Value>, RepositoryError>> {
        async move {
            let tables = self.tables.read().await;
            Ok(tables
                .get(&table)
                .map(|rows| {
                    rows.iter()
                        .map(|(_, doc)| doc)
                        .filter(|doc| filters.iter().all(|f| f.matches(doc)))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        }
        .boxed()
    }

    fn ping(&self) -> BoxFuture<'_, Result<(), RepositoryError>> {
        async { Ok(()) }.boxed()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_create_read_roundtrip() {
        let store = MemoryRecordStore::new();
        store
            .create(Table::Waitlist, "1", json!({"email": "a@pytogo.org"}))
            .await
            .unwrap();

        let doc = store.read(Table::Waitlist, "1").await.unwrap();
        assert_eq!(doc, Some(json!({"email": "a@pytogo.org"})));
        assert_eq!(store.read(Table::Waitlist, "2").await.unwrap(), None);
        assert_eq!(store.read(Table::Staff, "1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_key_conflicts() {
        let store = MemoryRecordStore::new();
        store.create(Table::Staff, "1", json!({})).await.unwrap();
        let err = store.create(Table::Staff, "1", json!({})).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryRecordStore::new();
        let err = store
            .update(Table::Registrations, "nope", json!({"checked": true}))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_update_merges() {
        let store = MemoryRecordStore::new();
        store
            .create(Table::Registrations, "r1", json!({"fullName": "tester 1", "checked": false}))
            .await
            .unwrap();
        let updated = store
            .update(Table::Registrations, "r1", json!({"checked": true}))
            .await
            .unwrap();
        assert_eq!(updated, json!({"fullName": "tester 1", "checked": true}));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryRecordStore::new();
        store.create(Table::Proposals, "7", json!({})).await.unwrap();
        store.delete(Table::Proposals, "7").await.unwrap();
        assert!(matches!(
            store.delete(Table::Proposals, "7").await,
            Err(RepositoryError::NotFound)
        ));
        assert_eq!(store.count(Table::Proposals).await, 0);
    }

    #[tokio::test]
    async fn test_list_filters_keep_insertion_order() {
        let store = MemoryRecordStore::new();
        for (key, status) in [("1", "accepted"), ("2", "waiting"), ("3", "accepted")] {
            store
                .create(Table::VolunteerInquiry, key, json!({"id": key, "status": status}))
                .await
                .unwrap();
        }

        let filters = [Filter::eq("status", "accepted")];
        let accepted = store.list(Table::VolunteerInquiry, &filters).await.unwrap();
        let ids: Vec<_> = accepted.iter().map(|d| d["id"].as_str().unwrap()).collect();
        assert_eq!(ids, ["1", "3"]);

        let all = store.list(Table::VolunteerInquiry, &[]).await.unwrap();
        assert_eq!(all.len(), 3);
    }
}
