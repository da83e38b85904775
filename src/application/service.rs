use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::domain::{
    Account, AccountId, Category, CategoryId, CategoryKind, Cents, Investment, InvestmentId,
    InvestmentKind, MonthlyTotals, PortfolioSummary, Transaction, TransactionId, User, UserId,
    monthly_totals, plan_entry, portfolio_summary, revert_delta,
};
use crate::store::{Collection, DocumentStore, Query, SqliteStore, StoreError, encode};

use super::AppError;
use super::auth::Principal;

/// Listing transactions fetches at most this many unless asked otherwise.
const DEFAULT_TRANSACTION_LIMIT: usize = 100;

/// Documents fetched per listing batch while wiping a collection.
const CASCADE_BATCH_LIMIT: usize = 1000;

/// The acting user, resolved once at the edge and passed into every call.
/// There is deliberately no ambient "current user" anywhere in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
}

impl Session {
    pub fn for_user(user: &User) -> Self {
        Self { user_id: user.id }
    }
}

/// Ledger service enforcing the balance-consistency rule: every transaction
/// mutates exactly one account balance by its category-signed amount, and
/// reverting a transaction exactly undoes that mutation.
///
/// The transaction write and the compensating balance write are two
/// independent store calls with no atomicity across them. Within one call
/// they are issued in a fixed order (transaction first, balance second);
/// across concurrent sessions touching the same account the read-modify-write
/// of the balance can lose an update. The contract assumes one writer per
/// account at a time.
pub struct LedgerService<S: DocumentStore> {
    store: S,
}

/// What goes into a new ledger entry.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub account_id: AccountId,
    pub category_id: CategoryId,
    pub amount: Cents,
    pub description: Option<String>,
    pub transaction_date: DateTime<Utc>,
}

/// Result of recording a transaction: the stored entry plus the balance
/// effect it had.
#[derive(Debug, Clone)]
pub struct EntryOutcome {
    pub transaction: Transaction,
    pub delta: Cents,
    pub account_balance: Cents,
}

/// Result of reverting a transaction. When the referenced account or
/// category no longer exists the reversal is skipped and only the
/// transaction is deleted; `balance_reverted` records which path was taken.
#[derive(Debug, Clone)]
pub struct RevertOutcome {
    pub transaction_id: TransactionId,
    pub balance_reverted: bool,
    pub account_balance: Option<Cents>,
}

/// Dashboard aggregate for one month.
#[derive(Debug, Clone)]
pub struct MonthlySummary {
    pub month: u32,
    pub year: i32,
    pub totals: MonthlyTotals,
    pub portfolio: PortfolioSummary,
}

/// What goes into a new or updated investment position.
#[derive(Debug, Clone)]
pub struct InvestmentInput {
    pub name: String,
    pub kind: InvestmentKind,
    pub quantity: f64,
    pub purchase_price: Cents,
    pub current_value: Cents,
    pub purchase_date: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Counts from a completed user-data wipe.
#[derive(Debug, Clone, Copy, Default)]
pub struct WipeSummary {
    pub transactions: usize,
    pub accounts: usize,
    pub categories: usize,
    pub investments: usize,
}

impl LedgerService<SqliteStore> {
    /// Initialize a new SQLite-backed service at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        Ok(Self::new(SqliteStore::init(database_path).await?))
    }

    /// Open an existing SQLite-backed service.
    pub async fn open(database_path: &str) -> Result<Self, AppError> {
        Ok(Self::new(SqliteStore::open(database_path).await?))
    }
}

impl<S: DocumentStore> LedgerService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Direct access to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    // ========================
    // User operations
    // ========================

    /// Find the user document for an authenticated principal, creating it
    /// on first contact. The remote auth service owns identity; this only
    /// heals a missing profile document.
    pub async fn ensure_user(&self, principal: &Principal) -> Result<User, AppError> {
        let existing = self
            .store
            .list(
                Collection::Users,
                Query::new().eq("auth_id", principal.auth_id.clone()).limit(1),
            )
            .await?;

        if let Some(doc) = existing.first() {
            return Ok(doc.decode()?);
        }

        let user = User::new(&principal.auth_id, &principal.email, &principal.name);
        let doc = self.store.create(Collection::Users, encode(&user)?).await?;
        info!(user = %principal.email, "created user profile document");
        Ok(doc.decode()?)
    }

    pub async fn get_user(&self, user_id: UserId) -> Result<User, AppError> {
        match self.store.get(Collection::Users, user_id).await {
            Ok(doc) => Ok(doc.decode()?),
            Err(StoreError::NotFound { .. }) => Err(AppError::UserNotFound(user_id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete everything a user owns: transactions, then accounts, then
    /// categories, then investments, then the profile document itself.
    /// Deletions are independent; failures are collected and surfaced as
    /// one aggregate error, with nothing rolled back. The profile is
    /// deleted last so an incomplete wipe can simply be retried.
    pub async fn delete_user_data(&self, user_id: UserId) -> Result<WipeSummary, AppError> {
        let mut summary = WipeSummary::default();
        let mut failures = Vec::new();

        let plan = [
            (Collection::Transactions, &mut summary.transactions),
            (Collection::Accounts, &mut summary.accounts),
            (Collection::Categories, &mut summary.categories),
            (Collection::Investments, &mut summary.investments),
        ];

        for (collection, deleted) in plan {
            loop {
                let docs = self
                    .store
                    .list(
                        collection,
                        Query::new()
                            .eq("user_id", user_id.to_string())
                            .limit(CASCADE_BATCH_LIMIT),
                    )
                    .await?;
                if docs.is_empty() {
                    break;
                }

                debug!(%collection, count = docs.len(), "wiping user documents");
                let mut batch_failed = false;
                for doc in docs {
                    match self.store.delete(collection, doc.id).await {
                        Ok(()) => *deleted += 1,
                        Err(e) => {
                            failures.push(format!("{}/{}: {}", collection, doc.id, e));
                            batch_failed = true;
                        }
                    }
                }
                // Re-listing would return the failed documents again
                if batch_failed {
                    break;
                }
            }
        }

        if !failures.is_empty() {
            warn!(
                user_id = %user_id,
                failed = failures.len(),
                "user data wipe left documents behind"
            );
            return Err(AppError::PartialCascade {
                deleted: summary.transactions
                    + summary.accounts
                    + summary.categories
                    + summary.investments,
                failures,
            });
        }

        match self.store.delete(Collection::Users, user_id).await {
            Ok(()) | Err(StoreError::NotFound { .. }) => {}
            Err(e) => {
                return Err(AppError::PartialCascade {
                    deleted: summary.transactions
                        + summary.accounts
                        + summary.categories
                        + summary.investments,
                    failures: vec![format!("users/{}: {}", user_id, e)],
                });
            }
        }

        info!(user_id = %user_id, "user data wiped");
        Ok(summary)
    }

    // ========================
    // Account operations
    // ========================

    pub async fn create_account(
        &self,
        session: Session,
        name: &str,
        kind: &str,
        opening_balance: Cents,
    ) -> Result<Account, AppError> {
        let name = non_empty("account name", name)?;
        let kind = non_empty("account type", kind)?;
        if opening_balance < 0 {
            return Err(AppError::InvalidInput {
                field: "balance",
                reason: "opening balance cannot be negative".into(),
            });
        }

        let account = Account::new(session.user_id, name, kind, opening_balance);
        let doc = self
            .store
            .create(Collection::Accounts, encode(&account)?)
            .await?;
        Ok(doc.decode()?)
    }

    pub async fn list_accounts(&self, session: Session) -> Result<Vec<Account>, AppError> {
        let docs = self
            .store
            .list(
                Collection::Accounts,
                Query::new().eq("user_id", session.user_id.to_string()),
            )
            .await?;
        docs.iter().map(|d| Ok(d.decode()?)).collect()
    }

    pub async fn get_account(
        &self,
        session: Session,
        id: AccountId,
    ) -> Result<Account, AppError> {
        let doc = match self.store.get(Collection::Accounts, id).await {
            Ok(doc) => doc,
            Err(StoreError::NotFound { .. }) => return Err(AppError::AccountNotFound(id)),
            Err(e) => return Err(e.into()),
        };
        let account: Account = doc.decode()?;
        // Documents owned by someone else are reported as missing.
        if account.user_id != session.user_id {
            return Err(AppError::AccountNotFound(id));
        }
        Ok(account)
    }

    /// Rename or retype an account. The balance is not editable here; it
    /// only moves through [`Self::record_transaction`] and
    /// [`Self::revert_transaction`].
    pub async fn update_account(
        &self,
        session: Session,
        id: AccountId,
        name: Option<&str>,
        kind: Option<&str>,
    ) -> Result<Account, AppError> {
        self.get_account(session, id).await?;

        let mut patch = serde_json::Map::new();
        if let Some(name) = name {
            patch.insert("name".into(), non_empty("account name", name)?.into());
        }
        if let Some(kind) = kind {
            patch.insert("kind".into(), non_empty("account type", kind)?.into());
        }

        let doc = self
            .store
            .update(Collection::Accounts, id, patch.into())
            .await?;
        Ok(doc.decode()?)
    }

    /// Delete an account. Refused while transactions still reference it,
    /// so deleting an account cannot orphan ledger entries.
    pub async fn delete_account(&self, session: Session, id: AccountId) -> Result<(), AppError> {
        let account = self.get_account(session, id).await?;

        let referencing = self
            .store
            .list(
                Collection::Transactions,
                Query::new()
                    .eq("user_id", session.user_id.to_string())
                    .eq("account_id", id.to_string())
                    .limit(1),
            )
            .await?;
        if !referencing.is_empty() {
            return Err(AppError::AccountInUse(account.name));
        }

        Ok(self.store.delete(Collection::Accounts, id).await?)
    }

    // ========================
    // Category operations
    // ========================

    pub async fn create_category(
        &self,
        session: Session,
        name: &str,
        kind: CategoryKind,
    ) -> Result<Category, AppError> {
        let name = non_empty("category name", name)?;
        let category = Category::new(session.user_id, name, kind);
        let doc = self
            .store
            .create(Collection::Categories, encode(&category)?)
            .await?;
        Ok(doc.decode()?)
    }

    pub async fn list_categories(&self, session: Session) -> Result<Vec<Category>, AppError> {
        let docs = self
            .store
            .list(
                Collection::Categories,
                Query::new().eq("user_id", session.user_id.to_string()),
            )
            .await?;
        docs.iter().map(|d| Ok(d.decode()?)).collect()
    }

    pub async fn get_category(
        &self,
        session: Session,
        id: CategoryId,
    ) -> Result<Category, AppError> {
        let doc = match self.store.get(Collection::Categories, id).await {
            Ok(doc) => doc,
            Err(StoreError::NotFound { .. }) => return Err(AppError::CategoryNotFound(id)),
            Err(e) => return Err(e.into()),
        };
        let category: Category = doc.decode()?;
        if category.user_id != session.user_id {
            return Err(AppError::CategoryNotFound(id));
        }
        Ok(category)
    }

    pub async fn update_category(
        &self,
        session: Session,
        id: CategoryId,
        name: Option<&str>,
        kind: Option<CategoryKind>,
    ) -> Result<Category, AppError> {
        self.get_category(session, id).await?;

        let mut patch = serde_json::Map::new();
        if let Some(name) = name {
            patch.insert("name".into(), non_empty("category name", name)?.into());
        }
        if let Some(kind) = kind {
            patch.insert("kind".into(), json!(kind));
        }

        let doc = self
            .store
            .update(Collection::Categories, id, patch.into())
            .await?;
        Ok(doc.decode()?)
    }

    /// Delete a category. Refused while transactions still reference it.
    pub async fn delete_category(
        &self,
        session: Session,
        id: CategoryId,
    ) -> Result<(), AppError> {
        let category = self.get_category(session, id).await?;

        let referencing = self
            .store
            .list(
                Collection::Transactions,
                Query::new()
                    .eq("user_id", session.user_id.to_string())
                    .eq("category_id", id.to_string())
                    .limit(1),
            )
            .await?;
        if !referencing.is_empty() {
            return Err(AppError::CategoryInUse(category.name));
        }

        Ok(self.store.delete(Collection::Categories, id).await?)
    }

    // ========================
    // Ledger entries
    // ========================

    /// Record a transaction and apply its signed amount to the account
    /// balance. Validation happens before any write: a rejected entry
    /// leaves the store untouched. On success exactly two writes happened,
    /// the transaction document and the compensating balance update.
    pub async fn record_transaction(
        &self,
        session: Session,
        input: NewTransaction,
    ) -> Result<EntryOutcome, AppError> {
        let category = self.get_category(session, input.category_id).await?;
        let account = self.get_account(session, input.account_id).await?;

        let plan = plan_entry(account.balance, category.kind, input.amount)
            .map_err(|e| AppError::from_entry_error(e, &account.name))?;

        let mut transaction = Transaction::new(
            session.user_id,
            account.id,
            category.id,
            input.amount,
            input.transaction_date,
        );
        if let Some(description) = input.description {
            transaction = transaction.with_description(description);
        }

        let doc = self
            .store
            .create(Collection::Transactions, encode(&transaction)?)
            .await?;
        let transaction: Transaction = doc.decode()?;

        // Second, dependent write. If it fails the transaction document
        // exists without its balance effect; that window is surfaced to the
        // caller as the store error, never retried silently.
        if let Err(e) = self
            .store
            .update(
                Collection::Accounts,
                account.id,
                json!({ "balance": plan.new_balance }),
            )
            .await
        {
            warn!(
                transaction_id = %transaction.id,
                account_id = %account.id,
                "transaction persisted but balance update failed"
            );
            return Err(e.into());
        }

        debug!(
            transaction_id = %transaction.id,
            delta = plan.delta,
            balance = plan.new_balance,
            "ledger entry applied"
        );

        Ok(EntryOutcome {
            transaction,
            delta: plan.delta,
            account_balance: plan.new_balance,
        })
    }

    /// Undo a recorded transaction: apply the inverse delta to the account
    /// balance, then delete the transaction document. If the category or
    /// account has since been deleted out from under the transaction the
    /// balance step is skipped and only the document is removed.
    pub async fn revert_transaction(
        &self,
        session: Session,
        id: TransactionId,
    ) -> Result<RevertOutcome, AppError> {
        let transaction = self.get_transaction(session, id).await?;

        // Only a genuinely missing reference takes the orphan path. Store
        // failures surface here with the entry left intact, so the revert
        // can be retried.
        let category = match self.get_category(session, transaction.category_id).await {
            Ok(category) => Some(category),
            Err(AppError::CategoryNotFound(_)) => None,
            Err(e) => return Err(e),
        };
        let account = match self.get_account(session, transaction.account_id).await {
            Ok(account) => Some(account),
            Err(AppError::AccountNotFound(_)) => None,
            Err(e) => return Err(e),
        };

        let outcome = match (category, account) {
            (Some(category), Some(account)) => {
                let delta = revert_delta(category.kind, transaction.amount);
                let new_balance = account.balance + delta;
                self.store
                    .update(
                        Collection::Accounts,
                        account.id,
                        json!({ "balance": new_balance }),
                    )
                    .await?;
                RevertOutcome {
                    transaction_id: id,
                    balance_reverted: true,
                    account_balance: Some(new_balance),
                }
            }
            _ => {
                // Orphaned entry: the balance it once affected is gone or
                // unresolvable, so there is nothing sound to compensate.
                warn!(transaction_id = %id, "reverting orphaned transaction without balance update");
                RevertOutcome {
                    transaction_id: id,
                    balance_reverted: false,
                    account_balance: None,
                }
            }
        };

        self.store.delete(Collection::Transactions, id).await?;
        debug!(transaction_id = %id, reverted = outcome.balance_reverted, "ledger entry reverted");
        Ok(outcome)
    }

    pub async fn get_transaction(
        &self,
        session: Session,
        id: TransactionId,
    ) -> Result<Transaction, AppError> {
        let doc = match self.store.get(Collection::Transactions, id).await {
            Ok(doc) => doc,
            Err(StoreError::NotFound { .. }) => return Err(AppError::TransactionNotFound(id)),
            Err(e) => return Err(e.into()),
        };
        let transaction: Transaction = doc.decode()?;
        if transaction.user_id != session.user_id {
            return Err(AppError::TransactionNotFound(id));
        }
        Ok(transaction)
    }

    /// The user's transactions, most recent first.
    pub async fn list_transactions(
        &self,
        session: Session,
        limit: Option<usize>,
    ) -> Result<Vec<Transaction>, AppError> {
        let docs = self
            .store
            .list(
                Collection::Transactions,
                Query::new()
                    .eq("user_id", session.user_id.to_string())
                    .order_desc("transaction_date")
                    .limit(limit.unwrap_or(DEFAULT_TRANSACTION_LIMIT)),
            )
            .await?;
        docs.iter().map(|d| Ok(d.decode()?)).collect()
    }

    // ========================
    // Dashboard
    // ========================

    /// Income/expense totals for a month plus the investment portfolio
    /// aggregate, as shown on the dashboard.
    pub async fn monthly_summary(
        &self,
        session: Session,
        month: u32,
        year: i32,
    ) -> Result<MonthlySummary, AppError> {
        if !(1..=12).contains(&month) {
            return Err(AppError::InvalidInput {
                field: "month",
                reason: format!("must be 1-12, got {}", month),
            });
        }

        let transactions = self.list_transactions(session, None).await?;
        let categories = self.list_categories(session).await?;
        let investments = self.list_investments(session).await?;

        Ok(MonthlySummary {
            month,
            year,
            totals: monthly_totals(&transactions, &categories, month, year),
            portfolio: portfolio_summary(&investments),
        })
    }

    // ========================
    // Investment operations
    // ========================

    pub async fn create_investment(
        &self,
        session: Session,
        input: InvestmentInput,
    ) -> Result<Investment, AppError> {
        validate_investment(&input)?;

        let mut investment = Investment::new(
            session.user_id,
            input.name.trim(),
            input.kind,
            input.quantity,
            input.purchase_price,
            input.current_value,
            input.purchase_date,
        );
        investment.closed_at = input.closed_at;

        let doc = self
            .store
            .create(Collection::Investments, encode(&investment)?)
            .await?;
        Ok(doc.decode()?)
    }

    /// The user's investments, newest first.
    pub async fn list_investments(&self, session: Session) -> Result<Vec<Investment>, AppError> {
        let docs = self
            .store
            .list(
                Collection::Investments,
                Query::new()
                    .eq("user_id", session.user_id.to_string())
                    .order_desc("created_at"),
            )
            .await?;
        docs.iter().map(|d| Ok(d.decode()?)).collect()
    }

    pub async fn get_investment(
        &self,
        session: Session,
        id: InvestmentId,
    ) -> Result<Investment, AppError> {
        let doc = match self.store.get(Collection::Investments, id).await {
            Ok(doc) => doc,
            Err(StoreError::NotFound { .. }) => return Err(AppError::InvestmentNotFound(id)),
            Err(e) => return Err(e.into()),
        };
        let investment: Investment = doc.decode()?;
        if investment.user_id != session.user_id {
            return Err(AppError::InvestmentNotFound(id));
        }
        Ok(investment)
    }

    /// Replace an investment position with new values.
    pub async fn update_investment(
        &self,
        session: Session,
        id: InvestmentId,
        input: InvestmentInput,
    ) -> Result<Investment, AppError> {
        validate_investment(&input)?;
        let existing = self.get_investment(session, id).await?;

        let patch = json!({
            "name": input.name.trim(),
            "kind": input.kind,
            "quantity": if input.kind.is_unit_based() { input.quantity } else { 1.0 },
            "purchase_price": input.purchase_price,
            "current_value": input.current_value,
            "purchase_date": input.purchase_date,
            "closed_at": input.closed_at,
        });

        let doc = self
            .store
            .update(Collection::Investments, existing.id, patch)
            .await?;
        Ok(doc.decode()?)
    }

    pub async fn delete_investment(
        &self,
        session: Session,
        id: InvestmentId,
    ) -> Result<(), AppError> {
        self.get_investment(session, id).await?;
        Ok(self.store.delete(Collection::Investments, id).await?)
    }

    /// Invested vs. current value across all positions.
    pub async fn portfolio(&self, session: Session) -> Result<PortfolioSummary, AppError> {
        let investments = self.list_investments(session).await?;
        Ok(portfolio_summary(&investments))
    }
}

fn non_empty(field: &'static str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput {
            field,
            reason: "must not be empty".into(),
        });
    }
    Ok(trimmed.to_string())
}

fn validate_investment(input: &InvestmentInput) -> Result<(), AppError> {
    if input.name.trim().is_empty() {
        return Err(AppError::InvalidInput {
            field: "name",
            reason: "must not be empty".into(),
        });
    }
    if input.kind.is_unit_based() && input.quantity <= 0.0 {
        return Err(AppError::InvalidInput {
            field: "quantity",
            reason: "must be greater than 0 for unit-based investments".into(),
        });
    }
    if input.purchase_price <= 0 {
        return Err(AppError::InvalidInput {
            field: "purchase price",
            reason: "must be greater than 0".into(),
        });
    }
    if input.current_value < 0 {
        return Err(AppError::InvalidInput {
            field: "current value",
            reason: "must be 0 or greater".into(),
        });
    }
    Ok(())
}
