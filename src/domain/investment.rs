use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, UserId};

pub type InvestmentId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvestmentKind {
    Equity,
    MutualFund,
    Bond,
    Deposit,
}

impl InvestmentKind {
    pub const ALL: [InvestmentKind; 4] = [
        InvestmentKind::Equity,
        InvestmentKind::MutualFund,
        InvestmentKind::Bond,
        InvestmentKind::Deposit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvestmentKind::Equity => "Equity",
            InvestmentKind::MutualFund => "MutualFund",
            InvestmentKind::Bond => "Bond",
            InvestmentKind::Deposit => "Deposit",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Equity" => Some(InvestmentKind::Equity),
            "MutualFund" => Some(InvestmentKind::MutualFund),
            "Bond" => Some(InvestmentKind::Bond),
            "Deposit" => Some(InvestmentKind::Deposit),
            _ => None,
        }
    }

    /// Equities and mutual funds are held in units; bonds and deposits are
    /// a single lump position.
    pub fn is_unit_based(&self) -> bool {
        matches!(self, InvestmentKind::Equity | InvestmentKind::MutualFund)
    }
}

impl std::fmt::Display for InvestmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An investment position. Independent of accounts: nothing links it to a
/// balance or a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Investment {
    pub id: InvestmentId,
    pub user_id: UserId,
    pub name: String,
    pub kind: InvestmentKind,
    pub quantity: f64,
    /// Price paid per unit (or total, for lump positions).
    pub purchase_price: Cents,
    /// Market value of the whole position today.
    pub current_value: Cents,
    pub purchase_date: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Investment {
    pub fn new(
        user_id: UserId,
        name: impl Into<String>,
        kind: InvestmentKind,
        quantity: f64,
        purchase_price: Cents,
        current_value: Cents,
        purchase_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::nil(),
            user_id,
            name: name.into(),
            kind,
            // Lump positions always hold exactly one "unit"
            quantity: if kind.is_unit_based() { quantity } else { 1.0 },
            purchase_price,
            current_value,
            purchase_date,
            closed_at: None,
            created_at: Utc::now(),
        }
    }

    /// Money put in: units held times the unit purchase price.
    pub fn invested(&self) -> Cents {
        (self.quantity * self.purchase_price as f64).round() as Cents
    }

    pub fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }
}
