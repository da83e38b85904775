//! The document-store collaborator: collection-based CRUD with a small
//! predicate language (field equality, descending order, result limit).
//!
//! Ledger data lives in a remote document database in spirit; everything
//! above this module only sees the [`DocumentStore`] trait. Two backends
//! ship with the crate: an sqlx/SQLite store for local persistence and an
//! in-memory store for tests.

mod memory;
mod sqlite;

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub type DocumentId = Uuid;

/// The named collections the ledger uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Accounts,
    Categories,
    Transactions,
    Investments,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Users,
        Collection::Accounts,
        Collection::Categories,
        Collection::Transactions,
        Collection::Investments,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Accounts => "accounts",
            Collection::Categories => "categories",
            Collection::Transactions => "transactions",
            Collection::Investments => "investments",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored document: an opaque id assigned by the store plus a JSON
/// payload.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub id: DocumentId,
    pub data: Value,
}

impl RawDocument {
    /// Deserialize the payload into an entity, injecting the document id
    /// into its `id` field.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        let mut data = self.data.clone();
        if let Some(object) = data.as_object_mut() {
            object.insert("id".into(), Value::String(self.id.to_string()));
        }
        Ok(serde_json::from_value(data)?)
    }
}

/// Serialize an entity into a storable payload. The `id` field is stripped;
/// document identity belongs to the store, not the payload.
pub fn encode<T: Serialize>(entity: &T) -> Result<Value, StoreError> {
    let mut data = serde_json::to_value(entity)?;
    if let Some(object) = data.as_object_mut() {
        object.remove("id");
    }
    Ok(data)
}

/// Query predicates: conjunction of field equalities, optional descending
/// order on a field, optional result limit.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filters: Vec<(String, Value)>,
    pub order_desc: Option<String>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn order_desc(mut self, field: impl Into<String>) -> Self {
        self.order_desc = Some(field.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Apply the predicates to a batch of documents. All backends delegate
    /// to this so filtering, ordering and truncation behave identically
    /// regardless of where the rows came from.
    pub fn apply(&self, mut documents: Vec<RawDocument>) -> Vec<RawDocument> {
        documents.retain(|doc| {
            self.filters
                .iter()
                .all(|(field, expected)| doc.data.get(field) == Some(expected))
        });

        if let Some(field) = &self.order_desc {
            documents.sort_by(|a, b| {
                let left = a.data.get(field).unwrap_or(&Value::Null);
                let right = b.data.get(field).unwrap_or(&Value::Null);
                compare_values(right, left)
            });
        }

        if let Some(limit) = self.limit {
            documents.truncate(limit);
        }

        documents
    }
}

/// Total order over JSON scalars: null < bool < number < string. RFC 3339
/// timestamps are strings, so date ordering falls out of the lexicographic
/// case.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) | Value::Object(_) => 4,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Document not found in {collection}: {id}")]
    NotFound {
        collection: Collection,
        id: DocumentId,
    },

    #[error("Malformed document payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Document store failure: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Collection-based CRUD over named collections. Every call is an async
/// suspension point and may fail; there is no transaction spanning two
/// calls, which is exactly why the ledger service orders its writes the
/// way it does.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List documents in a collection matching the query.
    async fn list(&self, collection: Collection, query: Query)
        -> Result<Vec<RawDocument>, StoreError>;

    /// Fetch a single document by id.
    async fn get(&self, collection: Collection, id: DocumentId)
        -> Result<RawDocument, StoreError>;

    /// Store a new document. The store assigns the id.
    async fn create(&self, collection: Collection, data: Value)
        -> Result<RawDocument, StoreError>;

    /// Shallow-merge `patch` into an existing document.
    async fn update(
        &self,
        collection: Collection,
        id: DocumentId,
        patch: Value,
    ) -> Result<RawDocument, StoreError>;

    /// Remove a document.
    async fn delete(&self, collection: Collection, id: DocumentId) -> Result<(), StoreError>;
}
