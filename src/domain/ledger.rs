use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountId, Actor, Amount};

pub type LedgerEntryId = Uuid;

/// Identifier of the domain object that caused an entry: an advance id,
/// an expense id, a transfer reference, a sales transaction id...
pub type ReferenceId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inflow,
    Outflow,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inflow => "inflow",
            Direction::Outflow => "outflow",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "inflow" => Some(Direction::Inflow),
            "outflow" => Some(Direction::Outflow),
            _ => None,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What kind of business event produced a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    ManualCashIn,
    ManualCashOut,
    SalesPayment,
    ExpensePayment,
    AdvanceIssuance,
    AdvanceRepayment,
    TransferIn,
    TransferOut,
    ReceivablesPayment,
    ReceivablesWriteoff,
    PurchaseOrderPayment,
}

impl SourceType {
    pub const ALL: [SourceType; 11] = [
        SourceType::ManualCashIn,
        SourceType::ManualCashOut,
        SourceType::SalesPayment,
        SourceType::ExpensePayment,
        SourceType::AdvanceIssuance,
        SourceType::AdvanceRepayment,
        SourceType::TransferIn,
        SourceType::TransferOut,
        SourceType::ReceivablesPayment,
        SourceType::ReceivablesWriteoff,
        SourceType::PurchaseOrderPayment,
    ];

    /// The one classification table. Every other inflow/outflow decision in
    /// the crate goes through here.
    pub fn direction(&self) -> Direction {
        match self {
            SourceType::ManualCashIn
            | SourceType::SalesPayment
            | SourceType::AdvanceRepayment
            | SourceType::ReceivablesPayment
            | SourceType::ReceivablesWriteoff
            | SourceType::TransferIn => Direction::Inflow,
            SourceType::ManualCashOut
            | SourceType::ExpensePayment
            | SourceType::AdvanceIssuance
            | SourceType::TransferOut
            | SourceType::PurchaseOrderPayment => Direction::Outflow,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::ManualCashIn => "manual_cash_in",
            SourceType::ManualCashOut => "manual_cash_out",
            SourceType::SalesPayment => "sales_payment",
            SourceType::ExpensePayment => "expense_payment",
            SourceType::AdvanceIssuance => "advance_issuance",
            SourceType::AdvanceRepayment => "advance_repayment",
            SourceType::TransferIn => "transfer_in",
            SourceType::TransferOut => "transfer_out",
            SourceType::ReceivablesPayment => "receivables_payment",
            SourceType::ReceivablesWriteoff => "receivables_writeoff",
            SourceType::PurchaseOrderPayment => "purchase_order_payment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One balance-affecting event on one account ("cash history").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    /// Monotonic append order, assigned by the store
    pub sequence: i64,
    pub account_id: AccountId,
    /// Fixed at creation from `source_type`
    pub direction: Direction,
    /// Always positive
    pub amount: Amount,
    pub description: String,
    pub source_type: SourceType,
    pub reference_id: ReferenceId,
    pub created_by: String,
    pub created_by_name: String,
    pub created_at: DateTime<Utc>,
    /// Set when the entry is hidden from active views (settled advances).
    /// Archived entries still count when reconciling balances.
    pub archived_at: Option<DateTime<Utc>>,
}

impl LedgerEntry {
    pub fn new(
        account_id: AccountId,
        source_type: SourceType,
        amount: Amount,
        reference_id: ReferenceId,
        description: impl Into<String>,
        actor: &Actor,
    ) -> Self {
        assert!(amount > 0, "Ledger entry amount must be positive");
        Self {
            id: Uuid::new_v4(),
            sequence: 0, // Will be set by the store
            account_id,
            direction: source_type.direction(),
            amount,
            description: description.into(),
            source_type,
            reference_id,
            created_by: actor.id.clone(),
            created_by_name: actor.display_name.clone(),
            created_at: Utc::now(),
            archived_at: None,
        }
    }

    pub fn is_inflow(&self) -> bool {
        is_inflow(self)
    }

    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }

    /// `+amount` for inflows, `-amount` for outflows.
    pub fn signed_amount(&self) -> Amount {
        match self.direction {
            Direction::Inflow => self.amount,
            Direction::Outflow => -self.amount,
        }
    }
}

/// Pure classification used by reconciliation and reporting.
pub fn is_inflow(entry: &LedgerEntry) -> bool {
    entry.direction == Direction::Inflow
}

/// Net effect of a sequence of entries on one account.
pub fn net_movement(account_id: AccountId, entries: &[LedgerEntry]) -> Amount {
    entries
        .iter()
        .filter(|e| e.account_id == account_id)
        .map(LedgerEntry::signed_amount)
        .sum()
}

/// Filter for querying ledger entries. All fields are optional; an empty
/// filter returns every active entry.
#[derive(Debug, Clone, Default)]
pub struct LedgerFilter {
    pub account_id: Option<AccountId>,
    pub from_date: Option<DateTime<Utc>>,
    /// Exclusive upper bound
    pub to_date: Option<DateTime<Utc>>,
    pub source_type: Option<SourceType>,
    pub include_archived: bool,
}

impl LedgerFilter {
    pub fn for_account(account_id: AccountId) -> Self {
        Self {
            account_id: Some(account_id),
            ..Self::default()
        }
    }

    pub fn with_source_type(mut self, source_type: SourceType) -> Self {
        self.source_type = Some(source_type);
        self
    }

    pub fn with_date_range(
        mut self,
        from_date: Option<DateTime<Utc>>,
        to_date: Option<DateTime<Utc>>,
    ) -> Self {
        self.from_date = from_date;
        self.to_date = to_date;
        self
    }

    pub fn including_archived(mut self) -> Self {
        self.include_archived = true;
        self
    }

    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        self.account_id.is_none_or(|id| entry.account_id == id)
            && self.source_type.is_none_or(|t| entry.source_type == t)
            && self.from_date.is_none_or(|from| entry.created_at >= from)
            && self.to_date.is_none_or(|to| entry.created_at < to)
            && (self.include_archived || !entry.is_archived())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor() -> Actor {
        Actor::new("u-1", "Kasir Satu")
    }

    #[test]
    fn test_classification_table() {
        let inflows = [
            SourceType::ManualCashIn,
            SourceType::SalesPayment,
            SourceType::AdvanceRepayment,
            SourceType::ReceivablesPayment,
            SourceType::ReceivablesWriteoff,
            SourceType::TransferIn,
        ];
        for t in SourceType::ALL {
            let expected = if inflows.contains(&t) {
                Direction::Inflow
            } else {
                Direction::Outflow
            };
            assert_eq!(t.direction(), expected, "{} misclassified", t);
        }
    }

    #[test]
    fn test_source_type_parse_matches_as_str() {
        for t in SourceType::ALL {
            assert_eq!(SourceType::from_str(t.as_str()), Some(t));
        }
        assert_eq!(SourceType::from_str("Kas Masuk"), None);
    }

    #[test]
    fn test_direction_derived_at_creation() {
        let account = Uuid::new_v4();
        let entry = LedgerEntry::new(
            account,
            SourceType::ExpensePayment,
            5000,
            Uuid::new_v4(),
            "Pemasukan tinta", // free text never drives classification
            &actor(),
        );
        assert_eq!(entry.direction, Direction::Outflow);
        assert!(!entry.is_inflow());
        assert_eq!(entry.signed_amount(), -5000);
        assert_eq!(entry.created_by, "u-1");
        assert_eq!(entry.created_by_name, "Kasir Satu");
    }

    #[test]
    #[should_panic(expected = "Ledger entry amount must be positive")]
    fn test_entry_requires_positive_amount() {
        LedgerEntry::new(
            Uuid::new_v4(),
            SourceType::ManualCashIn,
            0,
            Uuid::new_v4(),
            "",
            &actor(),
        );
    }

    #[test]
    fn test_net_movement_ignores_other_accounts() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let reference = Uuid::new_v4();
        let entries = vec![
            LedgerEntry::new(a, SourceType::SalesPayment, 10_000, reference, "", &actor()),
            LedgerEntry::new(a, SourceType::TransferOut, 3_000, reference, "", &actor()),
            LedgerEntry::new(b, SourceType::TransferIn, 3_000, reference, "", &actor()),
        ];

        assert_eq!(net_movement(a, &entries), 7_000);
        assert_eq!(net_movement(b, &entries), 3_000);
    }

    #[test]
    fn test_filter_hides_archived_by_default() {
        let account = Uuid::new_v4();
        let mut entry = LedgerEntry::new(
            account,
            SourceType::AdvanceIssuance,
            1_000,
            Uuid::new_v4(),
            "",
            &actor(),
        );
        let filter = LedgerFilter::for_account(account);
        assert!(filter.matches(&entry));

        entry.archived_at = Some(Utc::now());
        assert!(!filter.matches(&entry));
        assert!(filter.including_archived().matches(&entry));
    }

    #[test]
    fn test_filter_by_source_type_and_account() {
        let account = Uuid::new_v4();
        let entry = LedgerEntry::new(
            account,
            SourceType::TransferIn,
            1_000,
            Uuid::new_v4(),
            "",
            &actor(),
        );

        assert!(LedgerFilter::default().matches(&entry));
        assert!(!LedgerFilter::for_account(Uuid::new_v4()).matches(&entry));
        assert!(
            !LedgerFilter::for_account(account)
                .with_source_type(SourceType::TransferOut)
                .matches(&entry)
        );
    }
}
