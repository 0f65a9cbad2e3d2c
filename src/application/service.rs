use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::{
    Account, AccountId, AccountType, Actor, AdvanceId, Amount, EmployeeAdvance, Expense,
    ExpenseId, IntegrityReport, LedgerEntry, LedgerFilter, ReferenceId, RunningBalance,
    SourceType, TransferRequest, build_integrity_report, opening_balance, reconstruct_for_accounts,
    reconstruct_running_balances,
};
use crate::storage::{Repository, Stores};

use super::{
    AdvanceManager, AdvanceRequest, AppError, CashMovement, CashMovementService, ExpenseManager,
    TransferResult, TransferService,
};

/// Application service providing high-level operations for the ledger.
/// This is the primary interface for any client (CLI, API, TUI, etc.).
#[derive(Clone)]
pub struct LedgerService {
    stores: Stores,
    transfers: TransferService,
    advances: AdvanceManager,
    expenses: ExpenseManager,
    cash: CashMovementService,
}

impl LedgerService {
    /// Create a ledger service over the given stores.
    pub fn new(stores: Stores) -> Self {
        Self {
            transfers: TransferService::new(stores.clone()),
            advances: AdvanceManager::new(stores.clone()),
            expenses: ExpenseManager::new(stores.clone()),
            cash: CashMovementService::new(stores.clone()),
            stores,
        }
    }

    pub fn from_repository(repo: Repository) -> Self {
        Self::new(Stores::from_repository(repo))
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::from_repository(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::from_repository(repo))
    }

    // ========================
    // Account operations
    // ========================

    /// Create an account with `balance = initial_balance`. Payment-account
    /// status defaults to true for assets.
    pub async fn create_account(
        &self,
        name: String,
        account_type: AccountType,
        initial_balance: Amount,
        is_payment_account: Option<bool>,
    ) -> Result<Account, AppError> {
        if self.stores.accounts.get_account_by_name(&name).await?.is_some() {
            return Err(AppError::AccountAlreadyExists(name));
        }

        let mut account = Account::new(name, account_type, initial_balance);
        if let Some(is_payment) = is_payment_account {
            account = account.with_payment_account(is_payment);
        }

        self.stores.accounts.create_account(&account).await?;
        tracing::info!(
            account_id = %account.id,
            name = %account.name,
            account_type = %account.account_type,
            initial_balance,
            "account created"
        );
        Ok(account)
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Account, AppError> {
        self.stores
            .accounts
            .get_account(id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(id.to_string()))
    }

    pub async fn get_account_by_name(&self, name: &str) -> Result<Account, AppError> {
        self.stores
            .accounts
            .get_account_by_name(name)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(name.to_string()))
    }

    /// Look an account up by name, falling back to its id.
    pub async fn find_account(&self, key: &str) -> Result<Account, AppError> {
        if let Some(account) = self.stores.accounts.get_account_by_name(key).await? {
            return Ok(account);
        }
        match Uuid::parse_str(key) {
            Ok(id) => self.get_account(id).await,
            Err(_) => Err(AppError::AccountNotFound(key.to_string())),
        }
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>, AppError> {
        Ok(self.stores.accounts.list_accounts().await?)
    }

    /// Change the opening balance. The current balance moves by the same
    /// difference, so the ledger still reconciles.
    pub async fn set_initial_balance(
        &self,
        id: AccountId,
        initial_balance: Amount,
    ) -> Result<Account, AppError> {
        let account = self
            .stores
            .accounts
            .set_initial_balance(id, initial_balance)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(id.to_string()))?;

        tracing::info!(
            account = %account.name,
            initial_balance,
            balance = account.balance,
            "initial balance changed"
        );
        Ok(account)
    }

    /// Delete an account. Refused while any ledger entry references it.
    pub async fn delete_account(&self, id: AccountId) -> Result<(), AppError> {
        let account = self.get_account(id).await?;

        let entries = self.stores.ledger.count_for_account(id).await?;
        if entries > 0 {
            return Err(AppError::AccountInUse {
                account: account.name,
                entries,
            });
        }

        if !self.stores.accounts.delete_account(id).await? {
            return Err(AppError::AccountNotFound(account.name));
        }
        tracing::info!(account = %account.name, "account deleted");
        Ok(())
    }

    // ========================
    // Ledger queries
    // ========================

    /// Entries matching the filter, newest first.
    pub async fn list_ledger_entries(
        &self,
        filter: &LedgerFilter,
    ) -> Result<Vec<LedgerEntry>, AppError> {
        Ok(self.stores.ledger.list_entries(filter).await?)
    }

    /// Running balances over a caller-supplied newest-first slice of the
    /// account's history, anchored at the account's current balance.
    pub async fn reconstruct_running_balances(
        &self,
        account_id: AccountId,
        entries: &[LedgerEntry],
    ) -> Result<Vec<RunningBalance>, AppError> {
        let account = self.get_account(account_id).await?;
        Ok(reconstruct_running_balances(
            account.id,
            account.balance,
            entries,
        ))
    }

    /// Running balances for an account's whole history.
    pub async fn running_balances(
        &self,
        account_id: AccountId,
        include_archived: bool,
    ) -> Result<Vec<RunningBalance>, AppError> {
        let mut view = LedgerFilter::for_account(account_id);
        view.include_archived = include_archived;
        self.running_balances_matching(account_id, &view).await
    }

    /// Running balances for the entries of `account_id` that match `view`.
    ///
    /// The walk always covers the complete history, archived entries
    /// included, so the balances shown for a filtered subset stay exact.
    pub async fn running_balances_matching(
        &self,
        account_id: AccountId,
        view: &LedgerFilter,
    ) -> Result<Vec<RunningBalance>, AppError> {
        let account = self.get_account(account_id).await?;
        let history = self
            .stores
            .ledger
            .list_entries(&LedgerFilter::for_account(account.id).including_archived())
            .await?;

        let view = LedgerFilter {
            account_id: Some(account.id),
            ..view.clone()
        };
        Ok(
            reconstruct_running_balances(account.id, account.balance, &history)
                .into_iter()
                .filter(|row| view.matches(&row.entry))
                .collect(),
        )
    }

    /// Running balances for every account at once, newest first, for the
    /// entries matching `view`. Each row's balance is that of its own account.
    pub async fn running_balances_across(
        &self,
        view: &LedgerFilter,
    ) -> Result<Vec<RunningBalance>, AppError> {
        let balances: HashMap<AccountId, Amount> = self
            .stores
            .accounts
            .list_accounts()
            .await?
            .into_iter()
            .map(|account| (account.id, account.balance))
            .collect();
        let history = self
            .stores
            .ledger
            .list_entries(&LedgerFilter::default().including_archived())
            .await?;

        Ok(reconstruct_for_accounts(&balances, &history)
            .into_iter()
            .filter(|row| view.matches(&row.entry))
            .collect())
    }

    /// The account's balance just before `since`, recovered from the
    /// entries posted from then on.
    pub async fn opening_balance(
        &self,
        account_id: AccountId,
        since: DateTime<Utc>,
    ) -> Result<Amount, AppError> {
        let account = self.get_account(account_id).await?;
        let since_then = self
            .stores
            .ledger
            .list_entries(
                &LedgerFilter::for_account(account.id)
                    .with_date_range(Some(since), None)
                    .including_archived(),
            )
            .await?;
        Ok(opening_balance(account.id, account.balance, &since_then))
    }

    /// Compare every stored balance with its ledger and every advance with
    /// its repayments.
    pub async fn check_integrity(&self) -> Result<IntegrityReport, AppError> {
        let accounts = self.stores.accounts.list_accounts().await?;
        let advances = self.stores.advances.list_advances(false).await?;
        let totals = self.stores.ledger.ledger_totals().await?;

        let report = build_integrity_report(&accounts, &advances, &totals);
        if !report.is_ok() {
            tracing::warn!(
                balance_mismatches = report.balance_mismatches.len(),
                advance_issues = report.advance_issues.len(),
                unknown_accounts = report.unknown_accounts,
                "integrity check found problems"
            );
        }
        Ok(report)
    }

    // ========================
    // Transfers
    // ========================

    pub async fn transfer(
        &self,
        from_account: AccountId,
        to_account: AccountId,
        amount: Amount,
        description: String,
        actor: &Actor,
    ) -> Result<TransferResult, AppError> {
        let request = TransferRequest::new(from_account, to_account, amount, description);
        self.transfers.transfer(request, actor).await
    }

    pub async fn reverse_transfer(
        &self,
        reference: ReferenceId,
        actor: &Actor,
    ) -> Result<TransferResult, AppError> {
        self.transfers.reverse(reference, actor).await
    }

    // ========================
    // Advances
    // ========================

    pub async fn issue_advance(
        &self,
        request: AdvanceRequest,
        actor: &Actor,
    ) -> Result<EmployeeAdvance, AppError> {
        self.advances.issue(request, actor).await
    }

    pub async fn repay_advance(
        &self,
        advance_id: AdvanceId,
        amount: Amount,
        date: NaiveDate,
        actor: &Actor,
    ) -> Result<EmployeeAdvance, AppError> {
        self.advances.repay(advance_id, amount, date, actor).await
    }

    pub async fn delete_advance(&self, advance_id: AdvanceId, actor: &Actor) -> Result<(), AppError> {
        self.advances.delete(advance_id, actor).await
    }

    pub async fn get_advance(&self, advance_id: AdvanceId) -> Result<EmployeeAdvance, AppError> {
        self.advances.get(advance_id).await
    }

    pub async fn list_advances(&self, active_only: bool) -> Result<Vec<EmployeeAdvance>, AppError> {
        self.advances.list(active_only).await
    }

    // ========================
    // Expenses
    // ========================

    pub async fn record_expense(&self, expense: Expense, actor: &Actor) -> Result<Expense, AppError> {
        self.expenses.record(expense, actor).await
    }

    pub async fn delete_expense(&self, expense_id: ExpenseId, actor: &Actor) -> Result<(), AppError> {
        self.expenses.delete(expense_id, actor).await
    }

    pub async fn get_expense(&self, expense_id: ExpenseId) -> Result<Expense, AppError> {
        self.expenses.get(expense_id).await
    }

    pub async fn list_expenses(&self) -> Result<Vec<Expense>, AppError> {
        self.expenses.list().await
    }

    // ========================
    // Cash movements
    // ========================

    pub async fn cash_in(
        &self,
        account_id: AccountId,
        amount: Amount,
        description: &str,
        actor: &Actor,
    ) -> Result<CashMovement, AppError> {
        self.cash.cash_in(account_id, amount, description, actor).await
    }

    pub async fn cash_out(
        &self,
        account_id: AccountId,
        amount: Amount,
        description: &str,
        actor: &Actor,
    ) -> Result<CashMovement, AppError> {
        self.cash.cash_out(account_id, amount, description, actor).await
    }

    pub async fn record_payment(
        &self,
        source_type: SourceType,
        reference_id: ReferenceId,
        account_id: AccountId,
        amount: Amount,
        description: &str,
        actor: &Actor,
    ) -> Result<CashMovement, AppError> {
        self.cash
            .record_payment(source_type, reference_id, account_id, amount, description, actor)
            .await
    }

    pub async fn correct_balance(
        &self,
        account_id: AccountId,
        target: Amount,
        reason: &str,
        actor: &Actor,
    ) -> Result<Option<CashMovement>, AppError> {
        self.cash
            .correct_balance(account_id, target, reason, actor)
            .await
    }
}
