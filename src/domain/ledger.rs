use chrono::Datelike;

use super::{Category, CategoryKind, Cents, Investment, Transaction};

/// Signed effect of a transaction on its account balance.
/// Income credits, Expense debits.
pub fn entry_delta(kind: CategoryKind, amount: Cents) -> Cents {
    kind.sign() * amount
}

/// The two writes a ledger entry expands into: the stored transaction and
/// the compensating balance update on its account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPlan {
    pub delta: Cents,
    pub new_balance: Cents,
}

/// Validate an entry against the current account balance and compute the
/// balance it would leave behind. Expenses that exceed the balance are
/// rejected here, before anything is written.
pub fn plan_entry(
    balance: Cents,
    kind: CategoryKind,
    amount: Cents,
) -> Result<EntryPlan, EntryError> {
    if amount <= 0 {
        return Err(EntryError::NonPositiveAmount { amount });
    }
    if kind == CategoryKind::Expense && balance < amount {
        return Err(EntryError::InsufficientBalance {
            balance,
            required: amount,
        });
    }

    let delta = entry_delta(kind, amount);
    Ok(EntryPlan {
        delta,
        new_balance: balance + delta,
    })
}

/// Balance update that exactly undoes a previously applied entry.
pub fn revert_delta(kind: CategoryKind, amount: Cents) -> Cents {
    -entry_delta(kind, amount)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonthlyTotals {
    pub income: Cents,
    pub expense: Cents,
}

impl MonthlyTotals {
    pub fn net(&self) -> Cents {
        self.income - self.expense
    }
}

/// Sum income and expense for transactions falling in the given month.
/// Transactions whose category cannot be resolved are counted in neither
/// sum; both totals are sums of positive amounts and thus non-negative.
pub fn monthly_totals(
    transactions: &[Transaction],
    categories: &[Category],
    month: u32,
    year: i32,
) -> MonthlyTotals {
    let mut totals = MonthlyTotals::default();

    for tx in transactions {
        let date = tx.transaction_date;
        if date.month() != month || date.year() != year {
            continue;
        }

        let Some(category) = categories.iter().find(|c| c.id == tx.category_id) else {
            continue;
        };

        match category.kind {
            CategoryKind::Income => totals.income += tx.amount,
            CategoryKind::Expense => totals.expense += tx.amount,
        }
    }

    totals
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PortfolioSummary {
    pub invested: Cents,
    pub current_value: Cents,
}

impl PortfolioSummary {
    pub fn profit_loss(&self) -> Cents {
        self.current_value - self.invested
    }
}

/// Aggregate all investment positions into invested vs. current value.
pub fn portfolio_summary(investments: &[Investment]) -> PortfolioSummary {
    investments
        .iter()
        .fold(PortfolioSummary::default(), |mut acc, inv| {
            acc.invested += inv.invested();
            acc.current_value += inv.current_value;
            acc
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    NonPositiveAmount {
        amount: Cents,
    },
    InsufficientBalance {
        balance: Cents,
        required: Cents,
    },
}

impl std::fmt::Display for EntryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryError::NonPositiveAmount { amount } => {
                write!(f, "Amount must be positive, got {} cents", amount)
            }
            EntryError::InsufficientBalance { balance, required } => {
                write!(
                    f,
                    "Insufficient balance: {} cents available, {} cents required",
                    balance, required
                )
            }
        }
    }
}

impl std::error::Error for EntryError {}
