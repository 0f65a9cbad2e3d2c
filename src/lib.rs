//! Account ledger and cash-flow reconciliation engine.
//!
//! Balances live on accounts and change only through atomic store
//! primitives; every change is mirrored by a ledger entry so that
//! `balance == initial_balance + Σ signed entries` holds per account.

pub mod application;
pub mod cli;
pub mod domain;
pub mod storage;

pub use domain::*;
pub use storage::Repository;
