pub mod application;
pub mod cli;
pub mod domain;
pub mod store;

pub use application::{AppError, LedgerService, Session};
pub use domain::*;
pub use store::{DocumentStore, MemoryStore, SqliteStore};
