use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountId, CategoryId, Cents, UserId};

pub type TransactionId = Uuid;

/// A single ledger entry. The amount is always stored positive; the signed
/// effect on the referenced account is derived from the category kind when
/// the entry is applied or reverted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub account_id: AccountId,
    pub category_id: CategoryId,
    pub amount: Cents,
    pub description: Option<String>,
    pub transaction_date: DateTime<Utc>,
    pub recorded_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        user_id: UserId,
        account_id: AccountId,
        category_id: CategoryId,
        amount: Cents,
        transaction_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::nil(),
            user_id,
            account_id,
            category_id,
            amount,
            description: None,
            transaction_date,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
