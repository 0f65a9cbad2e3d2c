use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountId, Amount};

pub type AdvanceId = Uuid;
pub type RepaymentId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvanceStatus {
    /// Something is still owed
    Active,
    /// Fully repaid. Terminal.
    Settled,
}

impl std::fmt::Display for AdvanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdvanceStatus::Active => write!(f, "active"),
            AdvanceStatus::Settled => write!(f, "settled"),
        }
    }
}

/// A partial or full repayment. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceRepayment {
    pub id: RepaymentId,
    pub amount: Amount,
    pub date: NaiveDate,
    pub recorded_by: String,
    pub created_at: DateTime<Utc>,
}

impl AdvanceRepayment {
    pub fn new(amount: Amount, date: NaiveDate, recorded_by: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            amount,
            date,
            recorded_by: recorded_by.into(),
            created_at: Utc::now(),
        }
    }
}

/// Cash handed to an employee ahead of payroll ("kasbon").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeAdvance {
    pub id: AdvanceId,
    pub employee_id: String,
    pub employee_name: String,
    /// Original issued amount; never changes
    pub amount: Amount,
    pub date: NaiveDate,
    pub notes: Option<String>,
    /// Funding account
    pub account_id: AccountId,
    pub account_name: String,
    pub remaining_amount: Amount,
    /// Oldest first
    pub repayments: Vec<AdvanceRepayment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EmployeeAdvance {
    pub fn new(
        employee_id: impl Into<String>,
        employee_name: impl Into<String>,
        amount: Amount,
        date: NaiveDate,
        account_id: AccountId,
        account_name: impl Into<String>,
    ) -> Self {
        assert!(amount > 0, "Advance amount must be positive");
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            employee_id: employee_id.into(),
            employee_name: employee_name.into(),
            amount,
            date,
            notes: None,
            account_id,
            account_name: account_name.into(),
            remaining_amount: amount,
            repayments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn status(&self) -> AdvanceStatus {
        if self.remaining_amount > 0 {
            AdvanceStatus::Active
        } else {
            AdvanceStatus::Settled
        }
    }

    pub fn is_settled(&self) -> bool {
        self.status() == AdvanceStatus::Settled
    }

    pub fn total_repaid(&self) -> Amount {
        self.repayments.iter().map(|r| r.amount).sum()
    }

    /// `amount - Σ repayments`, clamped at zero.
    pub fn expected_remaining(&self) -> Amount {
        (self.amount - self.total_repaid()).max(0)
    }

    /// Check a prospective repayment against the outstanding amount.
    pub fn validate_repayment(&self, amount: Amount) -> Result<(), RepaymentError> {
        if amount <= 0 {
            return Err(RepaymentError::NonPositive(amount));
        }
        if amount > self.remaining_amount {
            return Err(RepaymentError::ExceedsRemaining {
                remaining: self.remaining_amount,
                requested: amount,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepaymentError {
    NonPositive(Amount),
    ExceedsRemaining { remaining: Amount, requested: Amount },
}

impl std::fmt::Display for RepaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepaymentError::NonPositive(amount) => {
                write!(f, "repayment amount must be positive, got {}", amount)
            }
            RepaymentError::ExceedsRemaining {
                remaining,
                requested,
            } => write!(
                f,
                "repayment of {} exceeds remaining amount {}",
                requested, remaining
            ),
        }
    }
}

impl std::error::Error for RepaymentError {}
