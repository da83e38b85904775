use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, UserId};

pub type AccountId = Uuid;

/// A money account (bank account, wallet, cash jar...). The `kind` is free
/// text chosen by the user. `balance` is the only mutable numeric field and
/// is maintained exclusively through the ledger service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Assigned by the document store on creation.
    pub id: AccountId,
    pub user_id: UserId,
    pub name: String,
    pub kind: String,
    pub balance: Cents,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(user_id: UserId, name: impl Into<String>, kind: impl Into<String>, balance: Cents) -> Self {
        Self {
            id: Uuid::nil(),
            user_id,
            name: name.into(),
            kind: kind.into(),
            balance,
            created_at: Utc::now(),
        }
    }
}
