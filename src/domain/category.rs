use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserId;

pub type CategoryId = Uuid;

/// Whether transactions in a category add to or subtract from an account
/// balance. This is the only place the sign of a ledger entry comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryKind {
    Income,
    Expense,
}

impl CategoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKind::Income => "Income",
            CategoryKind::Expense => "Expense",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Income" | "income" => Some(CategoryKind::Income),
            "Expense" | "expense" => Some(CategoryKind::Expense),
            _ => None,
        }
    }

    /// Sign applied to a transaction amount when it hits an account balance.
    pub fn sign(&self) -> i64 {
        match self {
            CategoryKind::Income => 1,
            CategoryKind::Expense => -1,
        }
    }
}

impl std::fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub user_id: UserId,
    pub name: String,
    pub kind: CategoryKind,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn new(user_id: UserId, name: impl Into<String>, kind: CategoryKind) -> Self {
        Self {
            id: Uuid::nil(),
            user_id,
            name: name.into(),
            kind,
            created_at: Utc::now(),
        }
    }
}
