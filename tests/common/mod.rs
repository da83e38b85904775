// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use std::sync::Mutex;

use rokda::application::{LedgerService, Principal, Session};
use rokda::domain::{Account, Category, CategoryKind, Cents, User};
use rokda::store::{
    Collection, DocumentId, DocumentStore, MemoryStore, Query, RawDocument, StoreError,
};

/// Create an in-memory service with a freshly ensured user profile.
pub async fn test_service() -> Result<(LedgerService<MemoryStore>, Session, User)> {
    test_service_for("alice@example.com").await
}

pub async fn test_service_for(
    email: &str,
) -> Result<(LedgerService<MemoryStore>, Session, User)> {
    let service = LedgerService::new(MemoryStore::new());
    let user = service
        .ensure_user(&Principal {
            auth_id: format!("auth-{email}"),
            email: email.to_string(),
            name: email.split('@').next().unwrap_or(email).to_string(),
        })
        .await?;
    let session = Session::for_user(&user);
    Ok((service, session, user))
}

/// Standard fixture: one funded account plus an income and an expense
/// category.
pub struct Ledger {
    pub account: Account,
    pub income: Category,
    pub expense: Category,
}

impl Ledger {
    pub async fn create<S: DocumentStore>(
        service: &LedgerService<S>,
        session: Session,
        opening_balance: Cents,
    ) -> Result<Self> {
        let account = service
            .create_account(session, "Checking", "Savings", opening_balance)
            .await?;
        let income = service
            .create_category(session, "Salary", CategoryKind::Income)
            .await?;
        let expense = service
            .create_category(session, "Groceries", CategoryKind::Expense)
            .await?;
        Ok(Self {
            account,
            income,
            expense,
        })
    }
}

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// Store wrapper that fails operations on demand, for exercising the
/// partial-failure paths.
pub struct FlakyStore {
    inner: MemoryStore,
    fail_gets_in: Mutex<Option<Collection>>,
    fail_deletes_in: Mutex<Option<Collection>>,
    fail_updates_in: Mutex<Option<Collection>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_gets_in: Mutex::new(None),
            fail_deletes_in: Mutex::new(None),
            fail_updates_in: Mutex::new(None),
        }
    }

    pub fn fail_gets_in(&self, collection: Collection) {
        *self.fail_gets_in.lock().unwrap() = Some(collection);
    }

    pub fn fail_deletes_in(&self, collection: Collection) {
        *self.fail_deletes_in.lock().unwrap() = Some(collection);
    }

    pub fn fail_updates_in(&self, collection: Collection) {
        *self.fail_updates_in.lock().unwrap() = Some(collection);
    }

    pub fn heal(&self) {
        *self.fail_gets_in.lock().unwrap() = None;
        *self.fail_deletes_in.lock().unwrap() = None;
        *self.fail_updates_in.lock().unwrap() = None;
    }

    pub fn count(&self, collection: Collection) -> usize {
        self.inner.count(collection)
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn list(
        &self,
        collection: Collection,
        query: Query,
    ) -> Result<Vec<RawDocument>, StoreError> {
        self.inner.list(collection, query).await
    }

    async fn get(
        &self,
        collection: Collection,
        id: DocumentId,
    ) -> Result<RawDocument, StoreError> {
        if *self.fail_gets_in.lock().unwrap() == Some(collection) {
            return Err(StoreError::Backend(anyhow!("injected get failure")));
        }
        self.inner.get(collection, id).await
    }

    async fn create(
        &self,
        collection: Collection,
        data: Value,
    ) -> Result<RawDocument, StoreError> {
        self.inner.create(collection, data).await
    }

    async fn update(
        &self,
        collection: Collection,
        id: DocumentId,
        patch: Value,
    ) -> Result<RawDocument, StoreError> {
        if *self.fail_updates_in.lock().unwrap() == Some(collection) {
            return Err(StoreError::Backend(anyhow!("injected update failure")));
        }
        self.inner.update(collection, id, patch).await
    }

    async fn delete(&self, collection: Collection, id: DocumentId) -> Result<(), StoreError> {
        if *self.fail_deletes_in.lock().unwrap() == Some(collection) {
            return Err(StoreError::Backend(anyhow!("injected delete failure")));
        }
        self.inner.delete(collection, id).await
    }
}
