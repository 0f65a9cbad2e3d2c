use chrono::NaiveDate;

use crate::domain::{
    AccountId, Actor, AdvanceId, AdvanceRepayment, Amount, EmployeeAdvance, LedgerEntry,
    RepaymentError, SourceType,
};
use crate::storage::{RepaymentOutcome, Stores};

use super::compensation::{Compensation, Undo};
use super::{AppError, require_positive};

/// Parameters for issuing an advance.
#[derive(Debug, Clone)]
pub struct AdvanceRequest {
    pub employee_id: String,
    pub employee_name: String,
    pub amount: Amount,
    pub date: NaiveDate,
    pub account_id: AccountId,
    pub notes: Option<String>,
}

/// Lifecycle of employee cash advances: issue, repay until settled, delete.
#[derive(Clone)]
pub struct AdvanceManager {
    stores: Stores,
}

impl AdvanceManager {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Issue an advance from a funding account.
    ///
    /// The advance record, the debit and the `AdvanceIssuance` entry are
    /// applied together or not at all.
    pub async fn issue(
        &self,
        request: AdvanceRequest,
        actor: &Actor,
    ) -> Result<EmployeeAdvance, AppError> {
        require_positive(request.amount)?;

        let account = self
            .stores
            .accounts
            .get_account(request.account_id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(request.account_id.to_string()))?;

        let mut advance = EmployeeAdvance::new(
            request.employee_id,
            request.employee_name,
            request.amount,
            request.date,
            account.id,
            account.name.clone(),
        );
        advance.notes = request.notes;

        let mut saga = Compensation::new("issue advance", &self.stores);

        self.stores.advances.save_advance(&advance).await?;
        saga.push(Undo::DeleteAdvance(advance.id));

        let debited = self
            .stores
            .accounts
            .mutate_balance(account.id, -advance.amount)
            .await;
        if saga.check(debited).await?.is_none() {
            return Err(saga.rollback(AppError::AccountNotFound(account.name)).await);
        }
        saga.push(Undo::Balance {
            account_id: account.id,
            delta: advance.amount,
        });

        let mut entry = LedgerEntry::new(
            account.id,
            SourceType::AdvanceIssuance,
            advance.amount,
            advance.id,
            format!("Advance to {}", advance.employee_name),
            actor,
        );
        let appended = self.stores.ledger.append(&mut entry).await;
        saga.check(appended).await?;
        saga.commit();

        tracing::info!(
            advance_id = %advance.id,
            employee = %advance.employee_id,
            account = %account.name,
            amount = advance.amount,
            actor = %actor.id,
            "advance issued"
        );
        Ok(advance)
    }

    /// Record a repayment. Account balances are not touched; the cash coming
    /// back is posted separately as a cash-in if it lands in an account.
    ///
    /// The repayment that brings `remaining_amount` to zero archives the
    /// issuance entry, which takes the advance out of outstanding views.
    pub async fn repay(
        &self,
        advance_id: AdvanceId,
        amount: Amount,
        date: NaiveDate,
        actor: &Actor,
    ) -> Result<EmployeeAdvance, AppError> {
        require_positive(amount)?;

        let advance = self
            .stores
            .advances
            .get_advance(advance_id)
            .await?
            .ok_or(AppError::AdvanceNotFound(advance_id))?;

        match advance.validate_repayment(amount) {
            Ok(()) => {}
            Err(RepaymentError::NonPositive(amount)) => {
                return Err(AppError::InvalidAmount(format!(
                    "repayment amount must be positive, got {}",
                    amount
                )));
            }
            Err(RepaymentError::ExceedsRemaining {
                remaining,
                requested,
            }) => {
                return Err(AppError::OverRepayment {
                    advance_id,
                    remaining,
                    requested,
                });
            }
        }

        let repayment = AdvanceRepayment::new(amount, date, actor.display_name.clone());

        // The store re-checks remaining_amount inside its own transaction, so
        // two racing repayments cannot both pass.
        let updated = match self
            .stores
            .advances
            .record_repayment(advance_id, &repayment)
            .await?
        {
            RepaymentOutcome::Applied(advance) => advance,
            RepaymentOutcome::ExceedsRemaining { remaining } => {
                return Err(AppError::OverRepayment {
                    advance_id,
                    remaining,
                    requested: amount,
                });
            }
            RepaymentOutcome::NotFound => return Err(AppError::AdvanceNotFound(advance_id)),
        };

        if updated.is_settled() {
            let mut saga = Compensation::new("repay advance", &self.stores);
            saga.push(Undo::RevertRepayment {
                advance_id,
                repayment_id: repayment.id,
            });

            let archived = self
                .stores
                .ledger
                .archive_by_reference(advance_id, SourceType::AdvanceIssuance)
                .await;
            let archived = saga.check(archived).await?;
            saga.commit();

            tracing::info!(
                advance_id = %advance_id,
                archived_entries = archived,
                "advance settled"
            );
        }

        tracing::info!(
            advance_id = %advance_id,
            amount,
            remaining = updated.remaining_amount,
            actor = %actor.id,
            "advance repayment recorded"
        );
        Ok(updated)
    }

    /// Delete an advance, reimbursing the funding account with the original
    /// issued amount and removing its issuance entry and repayments.
    ///
    /// The advance is claimed before any money moves, so of two concurrent
    /// deletes only one reimburses.
    pub async fn delete(&self, advance_id: AdvanceId, actor: &Actor) -> Result<(), AppError> {
        let advance = self
            .stores
            .advances
            .take_advance(advance_id)
            .await?
            .ok_or(AppError::AdvanceNotFound(advance_id))?;

        let mut saga = Compensation::new("delete advance", &self.stores);
        saga.push(Undo::RestoreAdvance(Box::new(advance.clone())));

        let found = self
            .stores
            .ledger
            .find_by_reference(advance_id, SourceType::AdvanceIssuance)
            .await;
        let entries = saga.check(found).await?;
        if entries.is_empty() {
            tracing::warn!(
                advance_id = %advance_id,
                "advance has no issuance entry, reimbursing anyway"
            );
        }

        let credited = self
            .stores
            .accounts
            .mutate_balance(advance.account_id, advance.amount)
            .await;
        if saga.check(credited).await?.is_none() {
            return Err(saga
                .rollback(AppError::AccountNotFound(advance.account_name))
                .await);
        }
        saga.push(Undo::Balance {
            account_id: advance.account_id,
            delta: -advance.amount,
        });

        for entry in entries {
            let removed = self.stores.ledger.remove(entry.id).await;
            if saga.check(removed).await? {
                saga.push(Undo::RestoreEntry(Box::new(entry)));
            } else {
                tracing::warn!(entry_id = %entry.id, "ledger entry already removed");
            }
        }
        saga.commit();

        tracing::info!(
            advance_id = %advance_id,
            account = %advance.account_name,
            reimbursed = advance.amount,
            repaid = advance.total_repaid(),
            actor = %actor.id,
            "advance deleted"
        );
        Ok(())
    }

    pub async fn get(&self, advance_id: AdvanceId) -> Result<EmployeeAdvance, AppError> {
        self.stores
            .advances
            .get_advance(advance_id)
            .await?
            .ok_or(AppError::AdvanceNotFound(advance_id))
    }

    pub async fn list(&self, active_only: bool) -> Result<Vec<EmployeeAdvance>, AppError> {
        Ok(self.stores.advances.list_advances(active_only).await?)
    }
}
