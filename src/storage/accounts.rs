use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::domain::{Account, AccountId, AccountType, Amount};

use super::repository::{format_timestamp, parse_id, parse_timestamp};
use super::{AccountStore, Repository, VersionedUpdate, Withdrawal};

const ACCOUNT_COLUMNS: &str =
    "id, name, account_type, balance, initial_balance, is_payment_account, version, created_at";

#[async_trait]
impl AccountStore for Repository {
    async fn create_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, name, account_type, balance, initial_balance, is_payment_account, version, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(account.id.to_string())
        .bind(&account.name)
        .bind(account.account_type.as_str())
        .bind(account.balance)
        .bind(account.initial_balance)
        .bind(account.is_payment_account)
        .bind(account.version)
        .bind(format_timestamp(account.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save account")?;
        Ok(())
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM accounts WHERE id = ?",
            ACCOUNT_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        row.as_ref().map(row_to_account).transpose()
    }

    async fn get_account_by_name(&self, name: &str) -> Result<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM accounts WHERE name = ?",
            ACCOUNT_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account by name")?;

        row.as_ref().map(row_to_account).transpose()
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM accounts ORDER BY name",
            ACCOUNT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts")?;

        rows.iter().map(row_to_account).collect()
    }

    async fn mutate_balance(&self, id: AccountId, delta: Amount) -> Result<Option<Account>> {
        // Single statement: the increment is applied under SQLite's write lock,
        // so concurrent callers serialize and no update is lost.
        let row = sqlx::query(&format!(
            r#"
            UPDATE accounts
            SET balance = balance + ?, version = version + 1
            WHERE id = ?
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(delta)
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to mutate account balance")?;

        row.as_ref().map(row_to_account).transpose()
    }

    async fn mutate_balance_at_version(
        &self,
        id: AccountId,
        delta: Amount,
        expected_version: i64,
    ) -> Result<VersionedUpdate> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE accounts
            SET balance = balance + ?, version = version + 1
            WHERE id = ? AND version = ?
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(delta)
        .bind(id.to_string())
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to mutate account balance at version")?;

        if let Some(row) = row {
            return Ok(VersionedUpdate::Applied(row_to_account(&row)?));
        }

        match self.get_account(id).await? {
            Some(account) => Ok(VersionedUpdate::Stale(account)),
            None => Ok(VersionedUpdate::NotFound),
        }
    }

    async fn withdraw(&self, id: AccountId, amount: Amount) -> Result<Withdrawal> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE accounts
            SET balance = balance - ?, version = version + 1
            WHERE id = ? AND balance >= ?
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(amount)
        .bind(id.to_string())
        .bind(amount)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to withdraw from account")?;

        if let Some(row) = row {
            return Ok(Withdrawal::Applied(row_to_account(&row)?));
        }

        // Guard failed: tell apart a missing account from a short one.
        match self.get_account(id).await? {
            Some(account) => Ok(Withdrawal::Insufficient {
                balance: account.balance,
            }),
            None => Ok(Withdrawal::NotFound),
        }
    }

    async fn set_initial_balance(
        &self,
        id: AccountId,
        new_initial_balance: Amount,
    ) -> Result<Option<Account>> {
        // SET expressions all read the pre-update row, so `initial_balance`
        // on the right-hand side is the old value.
        let row = sqlx::query(&format!(
            r#"
            UPDATE accounts
            SET balance = balance + (? - initial_balance),
                initial_balance = ?,
                version = version + 1
            WHERE id = ?
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(new_initial_balance)
        .bind(new_initial_balance)
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to set initial balance")?;

        row.as_ref().map(row_to_account).transpose()
    }

    async fn delete_account(&self, id: AccountId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete account")?;
        Ok(result.rows_affected() > 0)
    }
}

fn row_to_account(row: &SqliteRow) -> Result<Account> {
    let id_str: String = row.get("id");
    let account_type_str: String = row.get("account_type");
    let created_at_str: String = row.get("created_at");

    Ok(Account {
        id: parse_id(&id_str, "account ID")?,
        name: row.get("name"),
        account_type: account_type_str
            .parse::<AccountType>()
            .map_err(anyhow::Error::msg)?,
        balance: row.get("balance"),
        initial_balance: row.get("initial_balance"),
        is_payment_account: row.get::<i32, _>("is_payment_account") != 0,
        version: row.get("version"),
        created_at: parse_timestamp(&created_at_str, "created_at")?,
    })
}
