use thiserror::Error;

use crate::domain::{Cents, EntryError, format_cents};
use crate::store::{DocumentId, StoreError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid {field}: {reason}")]
    InvalidInput {
        field: &'static str,
        reason: String,
    },

    #[error("Insufficient balance in {account}: {} available, {} required", format_cents(*balance), format_cents(*required))]
    InsufficientBalance {
        account: String,
        balance: Cents,
        required: Cents,
    },

    #[error("User not found: {0}")]
    UserNotFound(DocumentId),

    #[error("Account not found: {0}")]
    AccountNotFound(DocumentId),

    #[error("Category not found: {0}")]
    CategoryNotFound(DocumentId),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(DocumentId),

    #[error("Investment not found: {0}")]
    InvestmentNotFound(DocumentId),

    #[error("Account {0} still has transactions; delete them first")]
    AccountInUse(String),

    #[error("Category {0} still has transactions; delete them first")]
    CategoryInUse(String),

    #[error("User data wipe incomplete: {deleted} documents deleted, {} failed: {}", failures.len(), failures.join("; "))]
    PartialCascade {
        deleted: usize,
        failures: Vec<String>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AppError {
    /// Lift a domain-level entry rejection into the application taxonomy,
    /// attaching the account name for display.
    pub(crate) fn from_entry_error(error: EntryError, account: &str) -> Self {
        match error {
            EntryError::NonPositiveAmount { amount } => AppError::InvalidInput {
                field: "amount",
                reason: format!("must be positive, got {}", format_cents(amount)),
            },
            EntryError::InsufficientBalance { balance, required } => {
                AppError::InsufficientBalance {
                    account: account.to_string(),
                    balance,
                    required,
                }
            }
        }
    }
}
