mod account;
mod category;
mod investment;
mod ledger;
mod money;
mod transaction;
mod user;

pub use account::*;
pub use category::*;
pub use investment::*;
pub use ledger::*;
pub use money::*;
pub use transaction::*;
pub use user::*;
