use uuid::Uuid;

use crate::domain::{
    Account, AccountId, Actor, Amount, Direction, LedgerEntry, ReferenceId, SourceType,
};
use crate::storage::{Stores, VersionedUpdate};

use super::compensation::{Compensation, Undo};
use super::{AppError, require_positive};

const MAX_CORRECTION_ATTEMPTS: usize = 16;

/// One posted movement: the account after the mutation and its entry.
#[derive(Debug, Clone)]
pub struct CashMovement {
    pub account: Account,
    pub entry: LedgerEntry,
}

/// Single-entry money movements: manual cash in/out, administrative
/// corrections, and payments posted by sales, receivables and purchasing.
#[derive(Clone)]
pub struct CashMovementService {
    stores: Stores,
}

impl CashMovementService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub async fn cash_in(
        &self,
        account_id: AccountId,
        amount: Amount,
        description: &str,
        actor: &Actor,
    ) -> Result<CashMovement, AppError> {
        self.record_payment(
            SourceType::ManualCashIn,
            Uuid::new_v4(),
            account_id,
            amount,
            description,
            actor,
        )
        .await
    }

    pub async fn cash_out(
        &self,
        account_id: AccountId,
        amount: Amount,
        description: &str,
        actor: &Actor,
    ) -> Result<CashMovement, AppError> {
        self.record_payment(
            SourceType::ManualCashOut,
            Uuid::new_v4(),
            account_id,
            amount,
            description,
            actor,
        )
        .await
    }

    /// Post a movement originating elsewhere (a sale, a receivable, a
    /// purchase order). The sign follows `source_type`.
    pub async fn record_payment(
        &self,
        source_type: SourceType,
        reference_id: ReferenceId,
        account_id: AccountId,
        amount: Amount,
        description: &str,
        actor: &Actor,
    ) -> Result<CashMovement, AppError> {
        require_positive(amount)?;

        let account = self
            .stores
            .accounts
            .get_account(account_id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(account_id.to_string()))?;

        let delta = match source_type.direction() {
            Direction::Inflow => amount,
            Direction::Outflow => -amount,
        };

        let mut saga = Compensation::new("record payment", &self.stores);

        let account = self
            .stores
            .accounts
            .mutate_balance(account.id, delta)
            .await?
            .ok_or(AppError::AccountNotFound(account.name))?;
        saga.push(Undo::Balance {
            account_id: account.id,
            delta: -delta,
        });

        let mut entry = LedgerEntry::new(
            account.id,
            source_type,
            amount,
            reference_id,
            description,
            actor,
        );
        let appended = self.stores.ledger.append(&mut entry).await;
        saga.check(appended).await?;
        saga.commit();

        tracing::info!(
            account = %account.name,
            source_type = %source_type,
            reference = %reference_id,
            amount,
            balance = account.balance,
            actor = %actor.id,
            "cash movement recorded"
        );
        Ok(CashMovement { account, entry })
    }

    /// Bring an account to `target` by posting the difference as a manual
    /// cash in or out. Returns `None` when the balance already matches.
    ///
    /// The difference is applied only if the account has not moved since it
    /// was read; otherwise it is recomputed from the fresh balance.
    pub async fn correct_balance(
        &self,
        account_id: AccountId,
        target: Amount,
        reason: &str,
        actor: &Actor,
    ) -> Result<Option<CashMovement>, AppError> {
        let mut observed = self
            .stores
            .accounts
            .get_account(account_id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(account_id.to_string()))?;

        let mut attempts = 0;
        let (account, difference) = loop {
            let difference = target - observed.balance;
            if difference == 0 {
                return Ok(None);
            }
            if attempts == MAX_CORRECTION_ATTEMPTS {
                return Err(AppError::ConcurrentUpdate {
                    account: observed.name,
                    attempts,
                });
            }
            attempts += 1;

            match self
                .stores
                .accounts
                .mutate_balance_at_version(observed.id, difference, observed.version)
                .await?
            {
                VersionedUpdate::Applied(account) => break (account, difference),
                VersionedUpdate::Stale(current) => {
                    tracing::debug!(
                        account = %current.name,
                        expected_version = observed.version,
                        version = current.version,
                        "account moved during correction, retrying"
                    );
                    observed = current;
                }
                VersionedUpdate::NotFound => {
                    return Err(AppError::AccountNotFound(observed.name));
                }
            }
        };

        let mut saga = Compensation::new("correct balance", &self.stores);
        saga.push(Undo::Balance {
            account_id: account.id,
            delta: -difference,
        });

        let source_type = if difference > 0 {
            SourceType::ManualCashIn
        } else {
            SourceType::ManualCashOut
        };
        let mut entry = LedgerEntry::new(
            account.id,
            source_type,
            difference.abs(),
            Uuid::new_v4(),
            format!("Balance correction: {}", reason),
            actor,
        );
        let appended = self.stores.ledger.append(&mut entry).await;
        saga.check(appended).await?;
        saga.commit();

        tracing::info!(
            account = %account.name,
            from = account.balance - difference,
            to = target,
            attempts,
            actor = %actor.id,
            "balance corrected"
        );
        Ok(Some(CashMovement { account, entry }))
    }
}
