use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Amount;

pub type AccountId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Cash drawers, bank accounts, e-wallets
    Asset,
    /// Supplier debts, unpaid payroll
    Liability,
    /// Owner capital, opening balances
    Equity,
    Revenue,
    Expense,
}

impl AccountType {
    pub const ALL: [AccountType; 5] = [
        AccountType::Asset,
        AccountType::Liability,
        AccountType::Equity,
        AccountType::Revenue,
        AccountType::Expense,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Asset => "asset",
            AccountType::Liability => "liability",
            AccountType::Equity => "equity",
            AccountType::Revenue => "revenue",
            AccountType::Expense => "expense",
        }
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asset" => Ok(AccountType::Asset),
            "liability" => Ok(AccountType::Liability),
            "equity" => Ok(AccountType::Equity),
            "revenue" => Ok(AccountType::Revenue),
            "expense" => Ok(AccountType::Expense),
            _ => Err(format!("invalid account type: {}", s)),
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named financial account. `balance` is the authoritative current value;
/// it only moves through the store's atomic increment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub account_type: AccountType,
    pub balance: Amount,
    pub initial_balance: Amount,
    /// Whether POS payments and transfers may target this account
    pub is_payment_account: bool,
    /// Bumped by every balance mutation
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(name: impl Into<String>, account_type: AccountType, initial_balance: Amount) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            account_type,
            balance: initial_balance,
            initial_balance,
            // Payment accounts are where money physically sits: cash drawers and banks.
            is_payment_account: matches!(account_type, AccountType::Asset),
            version: 0,
            created_at: Utc::now(),
        }
    }

    pub fn with_payment_account(mut self, is_payment_account: bool) -> Self {
        self.is_payment_account = is_payment_account;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_type_parse_matches_as_str() {
        for t in AccountType::ALL {
            assert_eq!(t.as_str().parse::<AccountType>(), Ok(t));
        }
        assert_eq!("ASSET".parse::<AccountType>(), Ok(AccountType::Asset));
        assert!("income".parse::<AccountType>().is_err());
    }

    #[test]
    fn test_new_account_starts_at_initial_balance() {
        let account = Account::new("Kas Toko", AccountType::Asset, 10_000_000);
        assert_eq!(account.balance, 10_000_000);
        assert_eq!(account.initial_balance, 10_000_000);
        assert_eq!(account.version, 0);
    }

    #[test]
    fn test_only_assets_are_payment_accounts_by_default() {
        assert!(Account::new("Bank BCA", AccountType::Asset, 0).is_payment_account);
        assert!(!Account::new("Modal", AccountType::Equity, 0).is_payment_account);
        assert!(!Account::new("Hutang", AccountType::Liability, 0).is_payment_account);

        let overridden = Account::new("Modal", AccountType::Equity, 0).with_payment_account(true);
        assert!(overridden.is_payment_account);
    }
}
