use crate::domain::{
    Account, Actor, LedgerEntry, ReferenceId, SourceType, TransferLegs, TransferRequest,
};
use crate::storage::{Stores, Withdrawal};

use super::compensation::{Compensation, Undo};
use super::{AppError, require_positive};

/// Result of a completed transfer
#[derive(Debug, Clone)]
pub struct TransferResult {
    pub reference: ReferenceId,
    /// Source account after the debit
    pub from_account: Account,
    /// Destination account after the credit
    pub to_account: Account,
    pub outflow: LedgerEntry,
    pub inflow: LedgerEntry,
}

/// Moves money between two accounts as one logical operation: two balance
/// mutations and two ledger legs, compensated on failure.
#[derive(Clone)]
pub struct TransferService {
    stores: Stores,
}

impl TransferService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub async fn transfer(
        &self,
        request: TransferRequest,
        actor: &Actor,
    ) -> Result<TransferResult, AppError> {
        require_positive(request.amount)?;
        if request.from_account == request.to_account {
            return Err(AppError::SameAccountTransfer(
                request.from_account.to_string(),
            ));
        }

        let from = self
            .stores
            .accounts
            .get_account(request.from_account)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(request.from_account.to_string()))?;
        let to = self
            .stores
            .accounts
            .get_account(request.to_account)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(request.to_account.to_string()))?;

        for account in [&from, &to] {
            if !account.is_payment_account {
                return Err(AppError::NotPaymentAccount(account.name.clone()));
            }
        }

        let mut legs = request.legs(actor);
        let mut saga = Compensation::new("transfer", &self.stores);

        // The sufficiency check and the debit are one statement, so the
        // decision is always made against the live balance.
        let from_account = match self
            .stores
            .accounts
            .withdraw(from.id, request.amount)
            .await?
        {
            Withdrawal::Applied(account) => account,
            Withdrawal::Insufficient { balance } => {
                return Err(AppError::InsufficientBalance {
                    account: from.name,
                    balance,
                    required: request.amount,
                });
            }
            Withdrawal::NotFound => return Err(AppError::AccountNotFound(from.name)),
        };
        saga.push(Undo::Balance {
            account_id: from.id,
            delta: request.amount,
        });

        let credited = self
            .stores
            .accounts
            .mutate_balance(to.id, request.amount)
            .await;
        let to_account = match saga.check(credited).await? {
            Some(account) => account,
            None => return Err(saga.rollback(AppError::AccountNotFound(to.name)).await),
        };
        saga.push(Undo::Balance {
            account_id: to.id,
            delta: -request.amount,
        });

        let appended = self.stores.ledger.append(&mut legs.outflow).await;
        saga.check(appended).await?;
        saga.push(Undo::RemoveEntry(legs.outflow.id));

        let appended = self.stores.ledger.append(&mut legs.inflow).await;
        saga.check(appended).await?;
        saga.commit();

        tracing::info!(
            reference = %legs.reference,
            from = %from_account.name,
            to = %to_account.name,
            amount = request.amount,
            actor = %actor.id,
            "transfer completed"
        );

        Ok(TransferResult {
            reference: legs.reference,
            from_account,
            to_account,
            outflow: legs.outflow,
            inflow: legs.inflow,
        })
    }

    /// Undo a transfer by issuing the equal-and-opposite transfer. The
    /// original legs stay on the ledger.
    pub async fn reverse(
        &self,
        reference: ReferenceId,
        actor: &Actor,
    ) -> Result<TransferResult, AppError> {
        let mut entries = self
            .stores
            .ledger
            .find_by_reference(reference, SourceType::TransferOut)
            .await?;
        entries.extend(
            self.stores
                .ledger
                .find_by_reference(reference, SourceType::TransferIn)
                .await?,
        );

        let legs =
            TransferLegs::from_entries(&entries).ok_or(AppError::TransferNotFound(reference))?;
        self.transfer(legs.request().reversed(), actor).await
    }
}
