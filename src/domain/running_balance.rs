//! Historical "balance after this entry" values for display.
//!
//! Balances are only ever stored as a single current value, so the history is
//! recovered by walking the ledger backward from that value and undoing one
//! entry at a time. Nothing computed here is written back.

use std::collections::HashMap;

use serde::Serialize;

use super::{AccountId, Amount, LedgerEntry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunningBalance {
    pub entry: LedgerEntry,
    /// Balance of the entry's own account immediately after it was applied
    pub balance_after: Amount,
}

/// Reconstruct running balances for one account.
///
/// `entries` must be newest-first. Entries that belong to another account are
/// skipped, not folded in. Each transfer leg carries its own direction, so a
/// `TransferIn` on this account counts as an inflow here regardless of the
/// opposite leg.
pub fn reconstruct_running_balances(
    account_id: AccountId,
    current_balance: Amount,
    entries: &[LedgerEntry],
) -> Vec<RunningBalance> {
    let mut working_balance = current_balance;

    entries
        .iter()
        .filter(|entry| entry.account_id == account_id)
        .map(|entry| {
            let balance_after = working_balance;
            working_balance -= entry.signed_amount();
            RunningBalance {
                entry: entry.clone(),
                balance_after,
            }
        })
        .collect()
}

/// Same as [`reconstruct_running_balances`] for a newest-first stream that
/// mixes several accounts. Each account gets its own accumulator, seeded from
/// `current_balances`; entries of accounts missing from the map are dropped.
/// Output keeps the input order.
pub fn reconstruct_for_accounts(
    current_balances: &HashMap<AccountId, Amount>,
    entries: &[LedgerEntry],
) -> Vec<RunningBalance> {
    let mut working: HashMap<AccountId, Amount> = current_balances.clone();

    entries
        .iter()
        .filter_map(|entry| {
            let balance = working.get_mut(&entry.account_id)?;
            let balance_after = *balance;
            *balance -= entry.signed_amount();
            Some(RunningBalance {
                entry: entry.clone(),
                balance_after,
            })
        })
        .collect()
}

/// The balance the account must have had before the oldest entry in
/// `entries`. For a complete history this equals the initial balance.
pub fn opening_balance(
    account_id: AccountId,
    current_balance: Amount,
    entries: &[LedgerEntry],
) -> Amount {
    current_balance - super::net_movement(account_id, entries)
}
