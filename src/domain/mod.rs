mod account;
mod actor;
mod advance;
mod expense;
mod integrity;
mod ledger;
mod money;
mod running_balance;
mod transfer;

pub use account::*;
pub use actor::*;
pub use advance::*;
pub use expense::*;
pub use integrity::*;
pub use ledger::*;
pub use money::*;
pub use running_balance::*;
pub use transfer::*;
