use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::domain::{Expense, ExpenseId};

use super::repository::{format_date, format_timestamp, parse_date, parse_id, parse_timestamp};
use super::{ExpenseStore, Repository};

const EXPENSE_COLUMNS: &str =
    "id, description, amount, account_id, account_name, date, category, created_at";

#[async_trait]
impl ExpenseStore for Repository {
    async fn save_expense(&self, expense: &Expense) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO expenses (id, description, amount, account_id, account_name, date, category, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(expense.id.to_string())
        .bind(&expense.description)
        .bind(expense.amount)
        .bind(expense.account_id.to_string())
        .bind(&expense.account_name)
        .bind(format_date(expense.date))
        .bind(&expense.category)
        .bind(format_timestamp(expense.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save expense")?;
        Ok(())
    }

    async fn get_expense(&self, id: ExpenseId) -> Result<Option<Expense>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM expenses WHERE id = ?",
            EXPENSE_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch expense")?;

        row.as_ref().map(row_to_expense).transpose()
    }

    async fn list_expenses(&self) -> Result<Vec<Expense>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM expenses ORDER BY date DESC, created_at DESC",
            EXPENSE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list expenses")?;

        rows.iter().map(row_to_expense).collect()
    }

    async fn delete_expense(&self, id: ExpenseId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete expense")?;
        Ok(result.rows_affected() > 0)
    }

    async fn take_expense(&self, id: ExpenseId) -> Result<Option<Expense>> {
        let row = sqlx::query(&format!(
            "DELETE FROM expenses WHERE id = ? RETURNING {}",
            EXPENSE_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to take expense")?;

        row.as_ref().map(row_to_expense).transpose()
    }
}

fn row_to_expense(row: &SqliteRow) -> Result<Expense> {
    let id_str: String = row.get("id");
    let account_id_str: String = row.get("account_id");
    let date_str: String = row.get("date");
    let created_at_str: String = row.get("created_at");

    Ok(Expense {
        id: parse_id(&id_str, "expense ID")?,
        description: row.get("description"),
        amount: row.get("amount"),
        account_id: parse_id(&account_id_str, "account ID")?,
        account_name: row.get("account_name"),
        date: parse_date(&date_str, "expense")?,
        category: row.get("category"),
        created_at: parse_timestamp(&created_at_str, "created_at")?,
    })
}
