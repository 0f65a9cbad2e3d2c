//! Use cases over the stores. Every mutating operation here is all-or-nothing
//! from the caller's point of view.

mod advances;
mod cash;
mod compensation;
mod error;
mod expenses;
mod service;
mod transfer;

pub use advances::*;
pub use cash::*;
pub use error::*;
pub use expenses::*;
pub use service::*;
pub use transfer::*;
