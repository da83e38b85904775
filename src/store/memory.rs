use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::{Collection, DocumentId, DocumentStore, Query, RawDocument, StoreError};

/// In-memory document store. Documents are kept per collection in insertion
/// order, so unordered listings are deterministic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<Collection, Vec<(DocumentId, Value)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in a collection.
    pub fn count(&self, collection: Collection) -> usize {
        self.collections
            .lock()
            .expect("memory store lock poisoned")
            .get(&collection)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(
        &self,
        collection: Collection,
        query: Query,
    ) -> Result<Vec<RawDocument>, StoreError> {
        let collections = self.collections.lock().expect("memory store lock poisoned");
        let documents = collections
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| RawDocument {
                        id: *id,
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(query.apply(documents))
    }

    async fn get(
        &self,
        collection: Collection,
        id: DocumentId,
    ) -> Result<RawDocument, StoreError> {
        let collections = self.collections.lock().expect("memory store lock poisoned");
        collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|(doc_id, _)| *doc_id == id))
            .map(|(id, data)| RawDocument {
                id: *id,
                data: data.clone(),
            })
            .ok_or(StoreError::NotFound { collection, id })
    }

    async fn create(
        &self,
        collection: Collection,
        data: Value,
    ) -> Result<RawDocument, StoreError> {
        let id = Uuid::new_v4();
        let mut collections = self.collections.lock().expect("memory store lock poisoned");
        collections
            .entry(collection)
            .or_default()
            .push((id, data.clone()));
        Ok(RawDocument { id, data })
    }

    async fn update(
        &self,
        collection: Collection,
        id: DocumentId,
        patch: Value,
    ) -> Result<RawDocument, StoreError> {
        let mut collections = self.collections.lock().expect("memory store lock poisoned");
        let entry = collections
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|(doc_id, _)| *doc_id == id))
            .ok_or(StoreError::NotFound { collection, id })?;

        if let (Some(target), Some(fields)) = (entry.1.as_object_mut(), patch.as_object()) {
            for (key, value) in fields {
                target.insert(key.clone(), value.clone());
            }
        }

        Ok(RawDocument {
            id,
            data: entry.1.clone(),
        })
    }

    async fn delete(&self, collection: Collection, id: DocumentId) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().expect("memory store lock poisoned");
        let docs = collections
            .get_mut(&collection)
            .ok_or(StoreError::NotFound { collection, id })?;
        let before = docs.len();
        docs.retain(|(doc_id, _)| *doc_id != id);
        if docs.len() == before {
            return Err(StoreError::NotFound { collection, id });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_create_get_update_delete() {
        let store = MemoryStore::new();

        let doc = store
            .create(Collection::Accounts, json!({"name": "Checking", "balance": 1000}))
            .await
            .unwrap();

        let fetched = store.get(Collection::Accounts, doc.id).await.unwrap();
        assert_eq!(fetched.data["name"], "Checking");

        let updated = store
            .update(Collection::Accounts, doc.id, json!({"balance": 700}))
            .await
            .unwrap();
        assert_eq!(updated.data["balance"], 700);
        assert_eq!(updated.data["name"], "Checking"); // untouched fields survive

        store.delete(Collection::Accounts, doc.id).await.unwrap();
        assert!(matches!(
            store.get(Collection::Accounts, doc.id).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_document_is_not_found() {
        let store = MemoryStore::new();
        let result = store.delete(Collection::Users, Uuid::new_v4()).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_collection() {
        let store = MemoryStore::new();
        store
            .create(Collection::Accounts, json!({"name": "a"}))
            .await
            .unwrap();
        store
            .create(Collection::Categories, json!({"name": "b"}))
            .await
            .unwrap();

        let accounts = store
            .list(Collection::Accounts, Query::new())
            .await
            .unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].data["name"], "a");
    }
}
