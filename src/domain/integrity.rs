use std::collections::HashMap;

use serde::Serialize;

use super::{Account, AccountId, AdvanceId, Amount, EmployeeAdvance, ReferenceId};

/// Balance drift found on one account: `balance` should equal
/// `initial_balance + Σ signed entries` (archived entries included).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceMismatch {
    pub account_id: AccountId,
    pub account_name: String,
    pub expected: Amount,
    pub actual: Amount,
}

impl BalanceMismatch {
    pub fn drift(&self) -> Amount {
        self.actual - self.expected
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AdvanceIssue {
    /// `remaining_amount` disagrees with `amount - Σ repayments`
    RemainingMismatch {
        advance_id: AdvanceId,
        expected: Amount,
        actual: Amount,
    },
    /// Active advance whose issuance entry is gone or archived
    MissingIssuanceEntry { advance_id: AdvanceId },
    /// Settled advance whose issuance entry is still in active views
    UnpurgedIssuanceEntry { advance_id: AdvanceId },
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub account_count: usize,
    pub entry_count: usize,
    pub advance_count: usize,
    pub balance_mismatches: Vec<BalanceMismatch>,
    pub advance_issues: Vec<AdvanceIssue>,
    /// Account ids referenced by entries but absent from the account table
    pub unknown_accounts: usize,
}

impl IntegrityReport {
    pub fn is_ok(&self) -> bool {
        self.balance_mismatches.is_empty()
            && self.advance_issues.is_empty()
            && self.unknown_accounts == 0
    }
}

/// Per-account net movement plus the issuance-entry state of each advance,
/// as aggregated by the store.
#[derive(Debug, Clone, Default)]
pub struct LedgerTotals {
    pub entry_count: usize,
    /// Σ signed amounts per account, archived included
    pub net_by_account: HashMap<AccountId, Amount>,
    /// Advance references with an active (non-archived) issuance entry
    pub active_issuances: Vec<ReferenceId>,
}

pub fn build_integrity_report(
    accounts: &[Account],
    advances: &[EmployeeAdvance],
    totals: &LedgerTotals,
) -> IntegrityReport {
    let balance_mismatches = accounts
        .iter()
        .filter_map(|account| {
            let net = totals.net_by_account.get(&account.id).copied().unwrap_or(0);
            let expected = account.initial_balance + net;
            (expected != account.balance).then(|| BalanceMismatch {
                account_id: account.id,
                account_name: account.name.clone(),
                expected,
                actual: account.balance,
            })
        })
        .collect();

    let mut advance_issues = Vec::new();
    for advance in advances {
        let expected = advance.expected_remaining();
        if expected != advance.remaining_amount {
            advance_issues.push(AdvanceIssue::RemainingMismatch {
                advance_id: advance.id,
                expected,
                actual: advance.remaining_amount,
            });
        }

        let active_entry = totals.active_issuances.contains(&advance.id);
        if advance.is_settled() {
            if active_entry {
                advance_issues.push(AdvanceIssue::UnpurgedIssuanceEntry {
                    advance_id: advance.id,
                });
            }
        } else if !active_entry {
            advance_issues.push(AdvanceIssue::MissingIssuanceEntry {
                advance_id: advance.id,
            });
        }
    }

    let unknown_accounts = totals
        .net_by_account
        .keys()
        .filter(|id| !accounts.iter().any(|a| &a.id == *id))
        .count();

    IntegrityReport {
        account_count: accounts.len(),
        entry_count: totals.entry_count,
        advance_count: advances.len(),
        balance_mismatches,
        advance_issues,
        unknown_accounts,
    }
}
