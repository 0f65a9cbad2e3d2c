//! Persistence primitives the ledger engine is written against.
//!
//! Every method is a single atomic step. Multi-step business operations are
//! composed (and compensated) by the application layer, so any backend that
//! offers these primitives can host the engine. [`Repository`] is the SQLite
//! implementation.

mod accounts;
mod advances;
mod expenses;
mod ledger;
mod repository;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{
    Account, AccountId, AdvanceId, AdvanceRepayment, Amount, EmployeeAdvance, Expense, ExpenseId,
    LedgerEntry, LedgerEntryId, LedgerFilter, LedgerTotals, ReferenceId, RepaymentId, SourceType,
};

pub use repository::*;

/// SQL migration for initial schema
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// The four stores the engine works against, shared behind `Arc`s.
#[derive(Clone)]
pub struct Stores {
    pub accounts: Arc<dyn AccountStore>,
    pub ledger: Arc<dyn LedgerEntryStore>,
    pub advances: Arc<dyn AdvanceStore>,
    pub expenses: Arc<dyn ExpenseStore>,
}

impl Stores {
    /// Back every store with the same SQLite repository.
    pub fn from_repository(repo: Repository) -> Self {
        let repo = Arc::new(repo);
        Self {
            accounts: repo.clone(),
            ledger: repo.clone(),
            advances: repo.clone(),
            expenses: repo,
        }
    }
}

/// Outcome of a guarded debit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Withdrawal {
    Applied(Account),
    Insufficient { balance: Amount },
    NotFound,
}

/// Outcome of a balance mutation conditioned on the account's version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionedUpdate {
    Applied(Account),
    /// The account moved since it was read; carries its current state.
    Stale(Account),
    NotFound,
}

/// Outcome of a guarded repayment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepaymentOutcome {
    Applied(EmployeeAdvance),
    ExceedsRemaining { remaining: Amount },
    NotFound,
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn create_account(&self, account: &Account) -> Result<()>;

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>>;

    async fn get_account_by_name(&self, name: &str) -> Result<Option<Account>>;

    async fn list_accounts(&self) -> Result<Vec<Account>>;

    /// Atomic `balance += delta`. Returns `None` if the account does not exist.
    async fn mutate_balance(&self, id: AccountId, delta: Amount) -> Result<Option<Account>>;

    /// Atomic `balance += delta` that only applies while the account is still
    /// at `expected_version`.
    async fn mutate_balance_at_version(
        &self,
        id: AccountId,
        delta: Amount,
        expected_version: i64,
    ) -> Result<VersionedUpdate>;

    /// Atomic `balance -= amount` that only applies while `balance >= amount`.
    async fn withdraw(&self, id: AccountId, amount: Amount) -> Result<Withdrawal>;

    /// Atomic `balance += new - initial; initial = new`.
    async fn set_initial_balance(
        &self,
        id: AccountId,
        new_initial_balance: Amount,
    ) -> Result<Option<Account>>;

    /// Returns false if nothing was deleted.
    async fn delete_account(&self, id: AccountId) -> Result<bool>;
}

#[async_trait]
pub trait LedgerEntryStore: Send + Sync {
    /// Insert a new entry, assigning its sequence and fixing its direction
    /// from its source type.
    async fn append(&self, entry: &mut LedgerEntry) -> Result<()>;

    /// Re-insert a previously removed entry unchanged (id, sequence and
    /// timestamps preserved). Used to undo a removal.
    async fn restore(&self, entry: &LedgerEntry) -> Result<()>;

    async fn get_entry(&self, id: LedgerEntryId) -> Result<Option<LedgerEntry>>;

    /// Newest first.
    async fn list_entries(&self, filter: &LedgerFilter) -> Result<Vec<LedgerEntry>>;

    /// All entries of a kind for one originating object, archived included.
    async fn find_by_reference(
        &self,
        reference_id: ReferenceId,
        source_type: SourceType,
    ) -> Result<Vec<LedgerEntry>>;

    async fn remove(&self, id: LedgerEntryId) -> Result<bool>;

    /// Returns the number of entries removed.
    async fn remove_by_reference(
        &self,
        reference_id: ReferenceId,
        source_type: SourceType,
    ) -> Result<u64>;

    /// Hide entries from active views without removing them.
    async fn archive_by_reference(
        &self,
        reference_id: ReferenceId,
        source_type: SourceType,
    ) -> Result<u64>;

    /// Entries referencing the account, archived included.
    async fn count_for_account(&self, account_id: AccountId) -> Result<i64>;

    async fn ledger_totals(&self) -> Result<LedgerTotals>;
}

#[async_trait]
pub trait AdvanceStore: Send + Sync {
    async fn save_advance(&self, advance: &EmployeeAdvance) -> Result<()>;

    /// Loaded together with its repayments, oldest first.
    async fn get_advance(&self, id: AdvanceId) -> Result<Option<EmployeeAdvance>>;

    async fn list_advances(&self, active_only: bool) -> Result<Vec<EmployeeAdvance>>;

    /// Insert the repayment and decrement `remaining_amount` in one step,
    /// refusing if the repayment exceeds what remains.
    async fn record_repayment(
        &self,
        advance_id: AdvanceId,
        repayment: &AdvanceRepayment,
    ) -> Result<RepaymentOutcome>;

    /// Inverse of `record_repayment`.
    async fn revert_repayment(
        &self,
        advance_id: AdvanceId,
        repayment_id: RepaymentId,
    ) -> Result<bool>;

    /// Deletes the advance and its repayments.
    async fn delete_advance(&self, id: AdvanceId) -> Result<bool>;

    /// Delete the advance and its repayments, returning what was deleted.
    /// Of two concurrent callers only one gets `Some`.
    async fn take_advance(&self, id: AdvanceId) -> Result<Option<EmployeeAdvance>>;

    /// Re-insert a taken advance with its repayments, ids preserved.
    async fn restore_advance(&self, advance: &EmployeeAdvance) -> Result<()>;
}

#[async_trait]
pub trait ExpenseStore: Send + Sync {
    async fn save_expense(&self, expense: &Expense) -> Result<()>;

    async fn get_expense(&self, id: ExpenseId) -> Result<Option<Expense>>;

    /// Newest `date` first.
    async fn list_expenses(&self) -> Result<Vec<Expense>>;

    async fn delete_expense(&self, id: ExpenseId) -> Result<bool>;

    /// Delete the expense, returning it. Of two concurrent callers only one
    /// gets `Some`.
    async fn take_expense(&self, id: ExpenseId) -> Result<Option<Expense>>;
}
