// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use cashbook::application::{AdvanceRequest, LedgerService};
use cashbook::domain::{
    Account, AccountId, AccountType, Actor, AdvanceId, AdvanceRepayment, Amount, EmployeeAdvance,
    Expense, ExpenseId, LedgerEntry, LedgerEntryId, LedgerFilter, LedgerTotals, ReferenceId,
    RepaymentId, SourceType,
};
use cashbook::storage::{
    AccountStore, AdvanceStore, ExpenseStore, LedgerEntryStore, RepaymentOutcome, Repository,
    Stores, VersionedUpdate, Withdrawal,
};
use chrono::NaiveDate;
use tempfile::TempDir;

/// Rupiah with two minor-unit digits: `rp(100_000)` is 100,000.00.
pub fn rp(whole: i64) -> Amount {
    whole * 100
}

pub fn cashier() -> Actor {
    Actor::new("u-kasir", "Kasir Satu")
}

pub fn day(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// A second connection to the database behind [`test_service`], bypassing
/// the service.
pub async fn open_repository(temp_dir: &TempDir) -> Result<Repository> {
    let db_path = temp_dir.path().join("test.db");
    Repository::connect(&format!("sqlite:{}", db_path.display())).await
}

/// Like [`test_service`], but every store goes through a [`FaultyStore`]
/// whose faults the test can arm.
pub async fn faulty_service() -> Result<(LedgerService, Arc<FaultyStore>, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let repo = Repository::init(&format!("sqlite:{}?mode=rwc", db_path.display())).await?;

    let store = Arc::new(FaultyStore::new(repo));
    let stores = Stores {
        accounts: store.clone(),
        ledger: store.clone(),
        advances: store.clone(),
        expenses: store.clone(),
    };
    Ok((LedgerService::new(stores), store, temp_dir))
}

/// Test fixture: the two payment accounts most tests move money between
pub struct StandardAccounts {
    pub kas: Account,
    pub bank: Account,
}

impl StandardAccounts {
    /// "Kas" with 100,000 and "Bank" with 50,000
    pub async fn create(service: &LedgerService) -> Result<Self> {
        let kas = service
            .create_account("Kas".into(), AccountType::Asset, rp(100_000), None)
            .await?;
        let bank = service
            .create_account("Bank".into(), AccountType::Asset, rp(50_000), None)
            .await?;
        Ok(Self { kas, bank })
    }
}

pub fn advance_request(account_id: AccountId, amount: Amount) -> AdvanceRequest {
    AdvanceRequest {
        employee_id: "emp-07".into(),
        employee_name: "Budi".into(),
        amount,
        date: day("2024-05-02"),
        account_id,
        notes: None,
    }
}

pub async fn balance(service: &LedgerService, id: AccountId) -> Result<Amount> {
    Ok(service.get_account(id).await?.balance)
}

/// `balance == initial_balance + Σ signed entries` for every account, checked
/// both by hand and through the integrity report.
pub async fn assert_ledger_matches_balances(service: &LedgerService) -> Result<()> {
    for account in service.list_accounts().await? {
        let entries = service
            .list_ledger_entries(&LedgerFilter::for_account(account.id).including_archived())
            .await?;
        let net: Amount = entries.iter().map(LedgerEntry::signed_amount).sum();
        assert_eq!(
            account.balance,
            account.initial_balance + net,
            "ledger does not reconcile for {}",
            account.name
        );
    }

    let report = service.check_integrity().await?;
    assert!(report.is_ok(), "integrity report: {:?}", report);
    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
enum FaultMode {
    #[default]
    Off,
    Once,
    After(usize),
}

/// A switch on one store primitive.
#[derive(Debug, Default)]
pub struct Fault(Mutex<FaultMode>);

impl Fault {
    /// Fail the next call only.
    pub fn fail_once(&self) {
        *self.0.lock().unwrap() = FaultMode::Once;
    }

    /// Let `successes` calls through, then fail every call.
    pub fn fail_after(&self, successes: usize) {
        *self.0.lock().unwrap() = FaultMode::After(successes);
    }

    pub fn fail_always(&self) {
        self.fail_after(0);
    }

    pub fn clear(&self) {
        *self.0.lock().unwrap() = FaultMode::Off;
    }

    fn trip(&self, operation: &str) -> Result<()> {
        let mut mode = self.0.lock().unwrap();
        match *mode {
            FaultMode::Off => Ok(()),
            FaultMode::Once => {
                *mode = FaultMode::Off;
                anyhow::bail!("injected failure: {}", operation)
            }
            FaultMode::After(0) => anyhow::bail!("injected failure: {}", operation),
            FaultMode::After(n) => {
                *mode = FaultMode::After(n - 1);
                Ok(())
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct Faults {
    pub mutate_balance: Fault,
    pub withdraw: Fault,
    pub append: Fault,
    pub restore: Fault,
    pub remove: Fault,
    pub archive: Fault,
    pub record_repayment: Fault,
    pub revert_repayment: Fault,
    pub delete_advance: Fault,
    pub take_advance: Fault,
    pub restore_advance: Fault,
    pub delete_expense: Fault,
    pub take_expense: Fault,
}

impl Faults {
    pub fn clear_all(&self) {
        for fault in [
            &self.mutate_balance,
            &self.withdraw,
            &self.append,
            &self.restore,
            &self.remove,
            &self.archive,
            &self.record_repayment,
            &self.revert_repayment,
            &self.delete_advance,
            &self.take_advance,
            &self.restore_advance,
            &self.delete_expense,
            &self.take_expense,
        ] {
            fault.clear();
        }
    }
}

/// Delegates to a real [`Repository`], failing armed primitives. Reads never
/// fail.
pub struct FaultyStore {
    inner: Repository,
    pub faults: Faults,
}

impl FaultyStore {
    pub fn new(inner: Repository) -> Self {
        Self {
            inner,
            faults: Faults::default(),
        }
    }

    /// The wrapped repository, bypassing every fault.
    pub fn inner(&self) -> &Repository {
        &self.inner
    }
}

#[async_trait]
impl AccountStore for FaultyStore {
    async fn create_account(&self, account: &Account) -> Result<()> {
        self.inner.create_account(account).await
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        self.inner.get_account(id).await
    }

    async fn get_account_by_name(&self, name: &str) -> Result<Option<Account>> {
        self.inner.get_account_by_name(name).await
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        self.inner.list_accounts().await
    }

    async fn mutate_balance(&self, id: AccountId, delta: Amount) -> Result<Option<Account>> {
        self.faults.mutate_balance.trip("mutate_balance")?;
        self.inner.mutate_balance(id, delta).await
    }

    async fn mutate_balance_at_version(
        &self,
        id: AccountId,
        delta: Amount,
        expected_version: i64,
    ) -> Result<VersionedUpdate> {
        self.faults.mutate_balance.trip("mutate_balance_at_version")?;
        self.inner
            .mutate_balance_at_version(id, delta, expected_version)
            .await
    }

    async fn withdraw(&self, id: AccountId, amount: Amount) -> Result<Withdrawal> {
        self.faults.withdraw.trip("withdraw")?;
        self.inner.withdraw(id, amount).await
    }

    async fn set_initial_balance(
        &self,
        id: AccountId,
        new_initial_balance: Amount,
    ) -> Result<Option<Account>> {
        self.inner.set_initial_balance(id, new_initial_balance).await
    }

    async fn delete_account(&self, id: AccountId) -> Result<bool> {
        self.inner.delete_account(id).await
    }
}

#[async_trait]
impl LedgerEntryStore for FaultyStore {
    async fn append(&self, entry: &mut LedgerEntry) -> Result<()> {
        self.faults.append.trip("append")?;
        self.inner.append(entry).await
    }

    async fn restore(&self, entry: &LedgerEntry) -> Result<()> {
        self.faults.restore.trip("restore")?;
        self.inner.restore(entry).await
    }

    async fn get_entry(&self, id: LedgerEntryId) -> Result<Option<LedgerEntry>> {
        self.inner.get_entry(id).await
    }

    async fn list_entries(&self, filter: &LedgerFilter) -> Result<Vec<LedgerEntry>> {
        self.inner.list_entries(filter).await
    }

    async fn find_by_reference(
        &self,
        reference_id: ReferenceId,
        source_type: SourceType,
    ) -> Result<Vec<LedgerEntry>> {
        self.inner.find_by_reference(reference_id, source_type).await
    }

    async fn remove(&self, id: LedgerEntryId) -> Result<bool> {
        self.faults.remove.trip("remove")?;
        self.inner.remove(id).await
    }

    async fn remove_by_reference(
        &self,
        reference_id: ReferenceId,
        source_type: SourceType,
    ) -> Result<u64> {
        self.faults.remove.trip("remove_by_reference")?;
        self.inner.remove_by_reference(reference_id, source_type).await
    }

    async fn archive_by_reference(
        &self,
        reference_id: ReferenceId,
        source_type: SourceType,
    ) -> Result<u64> {
        self.faults.archive.trip("archive_by_reference")?;
        self.inner.archive_by_reference(reference_id, source_type).await
    }

    async fn count_for_account(&self, account_id: AccountId) -> Result<i64> {
        self.inner.count_for_account(account_id).await
    }

    async fn ledger_totals(&self) -> Result<LedgerTotals> {
        self.inner.ledger_totals().await
    }
}

#[async_trait]
impl AdvanceStore for FaultyStore {
    async fn save_advance(&self, advance: &EmployeeAdvance) -> Result<()> {
        self.inner.save_advance(advance).await
    }

    async fn get_advance(&self, id: AdvanceId) -> Result<Option<EmployeeAdvance>> {
        self.inner.get_advance(id).await
    }

    async fn list_advances(&self, active_only: bool) -> Result<Vec<EmployeeAdvance>> {
        self.inner.list_advances(active_only).await
    }

    async fn record_repayment(
        &self,
        advance_id: AdvanceId,
        repayment: &AdvanceRepayment,
    ) -> Result<RepaymentOutcome> {
        self.faults.record_repayment.trip("record_repayment")?;
        self.inner.record_repayment(advance_id, repayment).await
    }

    async fn revert_repayment(
        &self,
        advance_id: AdvanceId,
        repayment_id: RepaymentId,
    ) -> Result<bool> {
        self.faults.revert_repayment.trip("revert_repayment")?;
        self.inner.revert_repayment(advance_id, repayment_id).await
    }

    async fn delete_advance(&self, id: AdvanceId) -> Result<bool> {
        self.faults.delete_advance.trip("delete_advance")?;
        self.inner.delete_advance(id).await
    }

    async fn take_advance(&self, id: AdvanceId) -> Result<Option<EmployeeAdvance>> {
        self.faults.take_advance.trip("take_advance")?;
        self.inner.take_advance(id).await
    }

    async fn restore_advance(&self, advance: &EmployeeAdvance) -> Result<()> {
        self.faults.restore_advance.trip("restore_advance")?;
        self.inner.restore_advance(advance).await
    }
}

#[async_trait]
impl ExpenseStore for FaultyStore {
    async fn save_expense(&self, expense: &Expense) -> Result<()> {
        self.inner.save_expense(expense).await
    }

    async fn get_expense(&self, id: ExpenseId) -> Result<Option<Expense>> {
        self.inner.get_expense(id).await
    }

    async fn list_expenses(&self) -> Result<Vec<Expense>> {
        self.inner.list_expenses().await
    }

    async fn delete_expense(&self, id: ExpenseId) -> Result<bool> {
        self.faults.delete_expense.trip("delete_expense")?;
        self.inner.delete_expense(id).await
    }

    async fn take_expense(&self, id: ExpenseId) -> Result<Option<Expense>> {
        self.faults.take_expense.trip("take_expense")?;
        self.inner.take_expense(id).await
    }
}
