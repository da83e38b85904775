pub mod auth;
pub mod error;
pub mod service;

pub use auth::{AuthError, AuthProvider, MemoryAuth, Principal};
pub use error::AppError;
pub use service::{
    EntryOutcome, InvestmentInput, LedgerService, MonthlySummary, NewTransaction, RevertOutcome,
    Session, WipeSummary,
};
