//! Undo log for multi-step operations.
//!
//! Each orchestrator records the inverse of every side effect as soon as the
//! effect is applied. On failure the log is replayed newest-first. If an undo
//! step itself fails the remaining steps still run, and the caller gets
//! `PartialFailure` naming every step that could not be applied.

use std::fmt;

use crate::domain::{
    AccountId, AdvanceId, Amount, EmployeeAdvance, Expense, ExpenseId, LedgerEntry, LedgerEntryId,
    RepaymentId,
};
use crate::storage::Stores;

use super::AppError;

#[derive(Debug, Clone)]
pub(crate) enum Undo {
    Balance { account_id: AccountId, delta: Amount },
    RemoveEntry(LedgerEntryId),
    RestoreEntry(Box<LedgerEntry>),
    DeleteAdvance(AdvanceId),
    RestoreAdvance(Box<EmployeeAdvance>),
    RevertRepayment {
        advance_id: AdvanceId,
        repayment_id: RepaymentId,
    },
    DeleteExpense(ExpenseId),
    RestoreExpense(Box<Expense>),
}

impl fmt::Display for Undo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Undo::Balance { account_id, delta } => {
                write!(f, "apply {:+} to account {}", delta, account_id)
            }
            Undo::RemoveEntry(id) => write!(f, "remove ledger entry {}", id),
            Undo::RestoreEntry(entry) => write!(
                f,
                "restore {} ledger entry {} ({} on account {})",
                entry.source_type, entry.id, entry.amount, entry.account_id
            ),
            Undo::DeleteAdvance(id) => write!(f, "delete advance {}", id),
            Undo::RestoreAdvance(advance) => write!(
                f,
                "restore advance {} with {} repayments",
                advance.id,
                advance.repayments.len()
            ),
            Undo::RevertRepayment {
                advance_id,
                repayment_id,
            } => write!(f, "revert repayment {} on advance {}", repayment_id, advance_id),
            Undo::DeleteExpense(id) => write!(f, "delete expense {}", id),
            Undo::RestoreExpense(expense) => write!(f, "restore expense {}", expense.id),
        }
    }
}

pub(crate) struct Compensation<'a> {
    operation: &'static str,
    stores: &'a Stores,
    steps: Vec<Undo>,
}

impl<'a> Compensation<'a> {
    pub fn new(operation: &'static str, stores: &'a Stores) -> Self {
        Self {
            operation,
            stores,
            steps: Vec::new(),
        }
    }

    pub fn push(&mut self, undo: Undo) {
        self.steps.push(undo);
    }

    /// Pass a store result through, rolling back on error.
    pub async fn check<T>(&mut self, result: anyhow::Result<T>) -> Result<T, AppError> {
        match result {
            Ok(value) => Ok(value),
            Err(err) => Err(self.rollback(AppError::Storage(err)).await),
        }
    }

    /// Undo everything recorded so far. Returns `cause` if the rollback was
    /// clean, `PartialFailure` otherwise.
    pub async fn rollback(&mut self, cause: AppError) -> AppError {
        if self.steps.is_empty() {
            return cause;
        }

        tracing::warn!(
            operation = self.operation,
            steps = self.steps.len(),
            error = %cause,
            "operation failed, compensating"
        );

        let mut unresolved = Vec::new();
        while let Some(step) = self.steps.pop() {
            if let Err(err) = self.apply(&step).await {
                unresolved.push(format!("{}: {:#}", step, err));
            }
        }

        if unresolved.is_empty() {
            return cause;
        }

        tracing::error!(
            operation = self.operation,
            error = %cause,
            unresolved = ?unresolved,
            "compensation incomplete, manual reconciliation required"
        );
        AppError::PartialFailure {
            operation: self.operation.to_string(),
            cause: cause.to_string(),
            unresolved,
        }
    }

    /// Forget the log once the whole operation has succeeded.
    pub fn commit(mut self) {
        self.steps.clear();
    }

    async fn apply(&self, step: &Undo) -> anyhow::Result<()> {
        match step {
            Undo::Balance { account_id, delta } => {
                self.stores
                    .accounts
                    .mutate_balance(*account_id, *delta)
                    .await?
                    .ok_or_else(|| anyhow::anyhow!("account {} no longer exists", account_id))?;
            }
            Undo::RemoveEntry(id) => {
                self.stores.ledger.remove(*id).await?;
            }
            Undo::RestoreEntry(entry) => {
                self.stores.ledger.restore(entry).await?;
            }
            Undo::DeleteAdvance(id) => {
                self.stores.advances.delete_advance(*id).await?;
            }
            Undo::RestoreAdvance(advance) => {
                self.stores.advances.restore_advance(advance).await?;
            }
            Undo::RevertRepayment {
                advance_id,
                repayment_id,
            } => {
                self.stores
                    .advances
                    .revert_repayment(*advance_id, *repayment_id)
                    .await?;
            }
            Undo::DeleteExpense(id) => {
                self.stores.expenses.delete_expense(*id).await?;
            }
            Undo::RestoreExpense(expense) => {
                self.stores.expenses.save_expense(expense).await?;
            }
        }
        Ok(())
    }
}
