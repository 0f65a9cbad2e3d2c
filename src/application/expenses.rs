use crate::domain::{Actor, Expense, ExpenseId, LedgerEntry, SourceType};
use crate::storage::Stores;

use super::compensation::{Compensation, Undo};
use super::{AppError, require_positive};

/// Manual expenses paid out of an account.
#[derive(Clone)]
pub struct ExpenseManager {
    stores: Stores,
}

impl ExpenseManager {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Record an expense: save it, debit its account and post an
    /// `ExpensePayment` entry referencing it.
    pub async fn record(&self, mut expense: Expense, actor: &Actor) -> Result<Expense, AppError> {
        require_positive(expense.amount)?;

        let account = self
            .stores
            .accounts
            .get_account(expense.account_id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(expense.account_id.to_string()))?;
        expense.account_name = account.name.clone();

        let mut saga = Compensation::new("record expense", &self.stores);

        self.stores.expenses.save_expense(&expense).await?;
        saga.push(Undo::DeleteExpense(expense.id));

        let debited = self
            .stores
            .accounts
            .mutate_balance(account.id, -expense.amount)
            .await;
        if saga.check(debited).await?.is_none() {
            return Err(saga.rollback(AppError::AccountNotFound(account.name)).await);
        }
        saga.push(Undo::Balance {
            account_id: account.id,
            delta: expense.amount,
        });

        let mut entry = LedgerEntry::new(
            account.id,
            SourceType::ExpensePayment,
            expense.amount,
            expense.id,
            expense.description.clone(),
            actor,
        );
        let appended = self.stores.ledger.append(&mut entry).await;
        saga.check(appended).await?;
        saga.commit();

        tracing::info!(
            expense_id = %expense.id,
            account = %account.name,
            amount = expense.amount,
            actor = %actor.id,
            "expense recorded"
        );
        Ok(expense)
    }

    /// Delete an expense, reimbursing its account and removing its ledger
    /// entry. Refuses up front if there is no entry to remove.
    ///
    /// The expense record is claimed before any money moves, so of two
    /// concurrent deletes only one reimburses.
    pub async fn delete(&self, expense_id: ExpenseId, actor: &Actor) -> Result<(), AppError> {
        let entries = self
            .stores
            .ledger
            .find_by_reference(expense_id, SourceType::ExpensePayment)
            .await?;
        if entries.is_empty() {
            return Err(match self.stores.expenses.get_expense(expense_id).await? {
                Some(_) => AppError::LedgerEntryMissing {
                    reference_id: expense_id,
                    source_type: SourceType::ExpensePayment.to_string(),
                },
                None => AppError::ExpenseNotFound(expense_id),
            });
        }

        let expense = self
            .stores
            .expenses
            .take_expense(expense_id)
            .await?
            .ok_or(AppError::ExpenseNotFound(expense_id))?;

        let mut saga = Compensation::new("delete expense", &self.stores);
        saga.push(Undo::RestoreExpense(Box::new(expense.clone())));

        let credited = self
            .stores
            .accounts
            .mutate_balance(expense.account_id, expense.amount)
            .await;
        if saga.check(credited).await?.is_none() {
            return Err(saga
                .rollback(AppError::AccountNotFound(expense.account_name))
                .await);
        }
        saga.push(Undo::Balance {
            account_id: expense.account_id,
            delta: -expense.amount,
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
            expense_id = %expense_id,
            account = %expense.account_name,
            reimbursed = expense.amount,
            actor = %actor.id,
            "expense deleted"
        );
        Ok(())
    }

    pub async fn get(&self, expense_id: ExpenseId) -> Result<Expense, AppError> {
        self.stores
            .expenses
            .get_expense(expense_id)
            .await?
            .ok_or(AppError::ExpenseNotFound(expense_id))
    }

    pub async fn list(&self) -> Result<Vec<Expense>, AppError> {
        Ok(self.stores.expenses.list_expenses().await?)
    }
}
