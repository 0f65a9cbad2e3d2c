use thiserror::Error;

use crate::domain::{AdvanceId, Amount, ExpenseId, ReferenceId};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Account already exists: {0}")]
    AccountAlreadyExists(String),

    #[error("Account {account} is referenced by {entries} ledger entries and cannot be deleted")]
    AccountInUse { account: String, entries: i64 },

    #[error("Insufficient balance in account {account}: balance {balance}, required {required}")]
    InsufficientBalance {
        account: String,
        balance: Amount,
        required: Amount,
    },

    #[error("Repayment of {requested} exceeds remaining {remaining} on advance {advance_id}")]
    OverRepayment {
        advance_id: AdvanceId,
        remaining: Amount,
        requested: Amount,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Cannot transfer from an account to itself: {0}")]
    SameAccountTransfer(String),

    #[error("Account {0} is not a payment account")]
    NotPaymentAccount(String),

    #[error("Advance not found: {0}")]
    AdvanceNotFound(AdvanceId),

    #[error("Expense not found: {0}")]
    ExpenseNotFound(ExpenseId),

    #[error("Transfer not found: {0}")]
    TransferNotFound(ReferenceId),

    #[error("No {source_type} ledger entry found for {reference_id}; refusing to reverse")]
    LedgerEntryMissing {
        reference_id: ReferenceId,
        source_type: String,
    },

    #[error("Account {account} kept changing; gave up after {attempts} attempts")]
    ConcurrentUpdate { account: String, attempts: usize },

    /// A multi-step operation failed and could not be fully undone. Needs
    /// manual reconciliation; retrying risks applying compensation twice.
    #[error("{operation} partially applied: {cause}; unresolved: {}", .unresolved.join("; "))]
    PartialFailure {
        operation: String,
        cause: String,
        unresolved: Vec<String>,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl AppError {
    /// Validation errors are raised before any side effect.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::InvalidAmount(_)
                | AppError::SameAccountTransfer(_)
                | AppError::OverRepayment { .. }
                | AppError::InsufficientBalance { .. }
                | AppError::NotPaymentAccount(_)
        )
    }

    pub fn is_partial_failure(&self) -> bool {
        matches!(self, AppError::PartialFailure { .. })
    }
}

pub(crate) fn require_positive(amount: Amount) -> Result<(), AppError> {
    if amount <= 0 {
        return Err(AppError::InvalidAmount(format!(
            "amount must be positive, got {}",
            amount
        )));
    }
    Ok(())
}
