use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

use crate::domain::{AdvanceId, AdvanceRepayment, EmployeeAdvance, RepaymentId};

use super::repository::{format_date, format_timestamp, parse_date, parse_id, parse_timestamp};
use super::{AdvanceStore, Repository, RepaymentOutcome};

const ADVANCE_COLUMNS: &str = "id, employee_id, employee_name, amount, date, notes, account_id, account_name, remaining_amount, created_at, updated_at";

async fn insert_advance<'e, E>(executor: E, advance: &EmployeeAdvance) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO employee_advances (id, employee_id, employee_name, amount, date, notes, account_id, account_name, remaining_amount, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(advance.id.to_string())
    .bind(&advance.employee_id)
    .bind(&advance.employee_name)
    .bind(advance.amount)
    .bind(format_date(advance.date))
    .bind(&advance.notes)
    .bind(advance.account_id.to_string())
    .bind(&advance.account_name)
    .bind(advance.remaining_amount)
    .bind(format_timestamp(advance.created_at))
    .bind(format_timestamp(advance.updated_at))
    .execute(executor)
    .await
    .context("Failed to save advance")?;
    Ok(())
}

async fn insert_repayment<'e, E>(
    executor: E,
    advance_id: AdvanceId,
    repayment: &AdvanceRepayment,
) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO advance_repayments (id, advance_id, amount, date, recorded_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(repayment.id.to_string())
    .bind(advance_id.to_string())
    .bind(repayment.amount)
    .bind(format_date(repayment.date))
    .bind(&repayment.recorded_by)
    .bind(format_timestamp(repayment.created_at))
    .execute(executor)
    .await
    .context("Failed to save repayment")?;
    Ok(())
}

impl Repository {
    async fn repayments_for(&self, advance_id: AdvanceId) -> Result<Vec<AdvanceRepayment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, advance_id, amount, date, recorded_by, created_at
            FROM advance_repayments
            WHERE advance_id = ?
            ORDER BY created_at, rowid
            "#,
        )
        .bind(advance_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch repayments")?;

        rows.iter().map(row_to_repayment).collect()
    }
}

#[async_trait]
impl AdvanceStore for Repository {
    async fn save_advance(&self, advance: &EmployeeAdvance) -> Result<()> {
        insert_advance(&self.pool, advance).await
    }

    async fn get_advance(&self, id: AdvanceId) -> Result<Option<EmployeeAdvance>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM employee_advances WHERE id = ?",
            ADVANCE_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch advance")?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut advance = row_to_advance(&row)?;
        advance.repayments = self.repayments_for(advance.id).await?;
        Ok(Some(advance))
    }

    async fn list_advances(&self, active_only: bool) -> Result<Vec<EmployeeAdvance>> {
        let query = if active_only {
            format!(
                "SELECT {} FROM employee_advances WHERE remaining_amount > 0 ORDER BY date DESC, created_at DESC",
                ADVANCE_COLUMNS
            )
        } else {
            format!(
                "SELECT {} FROM employee_advances ORDER BY date DESC, created_at DESC",
                ADVANCE_COLUMNS
            )
        };

        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list advances")?;
        let mut advances: Vec<EmployeeAdvance> =
            rows.iter().map(row_to_advance).collect::<Result<_>>()?;

        let repayment_rows = sqlx::query(
            r#"
            SELECT id, advance_id, amount, date, recorded_by, created_at
            FROM advance_repayments
            ORDER BY created_at, rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list repayments")?;

        let mut by_advance: HashMap<AdvanceId, Vec<AdvanceRepayment>> = HashMap::new();
        for row in &repayment_rows {
            let advance_id_str: String = row.get("advance_id");
            by_advance
                .entry(parse_id(&advance_id_str, "advance ID")?)
                .or_default()
                .push(row_to_repayment(row)?);
        }
        for advance in &mut advances {
            advance.repayments = by_advance.remove(&advance.id).unwrap_or_default();
        }

        Ok(advances)
    }

    async fn record_repayment(
        &self,
        advance_id: AdvanceId,
        repayment: &AdvanceRepayment,
    ) -> Result<RepaymentOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin repayment transaction")?;

        let updated = sqlx::query(
            r#"
            UPDATE employee_advances
            SET remaining_amount = remaining_amount - ?, updated_at = ?
            WHERE id = ? AND remaining_amount >= ?
            "#,
        )
        .bind(repayment.amount)
        .bind(format_timestamp(Utc::now()))
        .bind(advance_id.to_string())
        .bind(repayment.amount)
        .execute(&mut *tx)
        .await
        .context("Failed to decrement remaining amount")?;

        if updated.rows_affected() == 0 {
            tx.rollback().await.context("Failed to roll back repayment")?;
            return Ok(match self.get_advance(advance_id).await? {
                Some(advance) => RepaymentOutcome::ExceedsRemaining {
                    remaining: advance.remaining_amount,
                },
                None => RepaymentOutcome::NotFound,
            });
        }

        insert_repayment(&mut *tx, advance_id, repayment).await?;

        tx.commit().await.context("Failed to commit repayment")?;

        let advance = self
            .get_advance(advance_id)
            .await?
            .context("Advance vanished after repayment")?;
        Ok(RepaymentOutcome::Applied(advance))
    }

    async fn revert_repayment(
        &self,
        advance_id: AdvanceId,
        repayment_id: RepaymentId,
    ) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin repayment reversal")?;

        let amount: Option<i64> = sqlx::query_scalar(
            "DELETE FROM advance_repayments WHERE id = ? AND advance_id = ? RETURNING amount",
        )
        .bind(repayment_id.to_string())
        .bind(advance_id.to_string())
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to delete repayment")?;

        let Some(amount) = amount else {
            tx.rollback().await.context("Failed to roll back repayment reversal")?;
            return Ok(false);
        };

        sqlx::query(
            "UPDATE employee_advances SET remaining_amount = remaining_amount + ?, updated_at = ? WHERE id = ?",
        )
        .bind(amount)
        .bind(format_timestamp(Utc::now()))
        .bind(advance_id.to_string())
        .execute(&mut *tx)
        .await
        .context("Failed to restore remaining amount")?;

        tx.commit().await.context("Failed to commit repayment reversal")?;
        Ok(true)
    }

    async fn delete_advance(&self, id: AdvanceId) -> Result<bool> {
        // Repayments go with it (ON DELETE CASCADE).
        let result = sqlx::query("DELETE FROM employee_advances WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete advance")?;
        Ok(result.rows_affected() > 0)
    }

    async fn take_advance(&self, id: AdvanceId) -> Result<Option<EmployeeAdvance>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin advance deletion")?;

        // Writes first, so the transaction holds the write lock from its
        // first statement on.
        let repayment_rows = sqlx::query(
            r#"
            DELETE FROM advance_repayments
            WHERE advance_id = ?
            RETURNING id, advance_id, amount, date, recorded_by, created_at
            "#,
        )
        .bind(id.to_string())
        .fetch_all(&mut *tx)
        .await
        .context("Failed to delete repayments")?;

        let row = sqlx::query(&format!(
            "DELETE FROM employee_advances WHERE id = ? RETURNING {}",
            ADVANCE_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to delete advance")?;

        let Some(row) = row else {
            tx.rollback().await.context("Failed to roll back advance deletion")?;
            return Ok(None);
        };

        let mut advance = row_to_advance(&row)?;
        advance.repayments = repayment_rows
            .iter()
            .map(row_to_repayment)
            .collect::<Result<_>>()?;
        advance.repayments.sort_by_key(|r| r.created_at);

        tx.commit().await.context("Failed to commit advance deletion")?;
        Ok(Some(advance))
    }

    async fn restore_advance(&self, advance: &EmployeeAdvance) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin advance restore")?;

        insert_advance(&mut *tx, advance).await?;
        for repayment in &advance.repayments {
            insert_repayment(&mut *tx, advance.id, repayment).await?;
        }

        tx.commit().await.context("Failed to commit advance restore")?;
        Ok(())
    }
}

fn row_to_advance(row: &SqliteRow) -> Result<EmployeeAdvance> {
    let id_str: String = row.get("id");
    let account_id_str: String = row.get("account_id");
    let date_str: String = row.get("date");
    let created_at_str: String = row.get("created_at");
    let updated_at_str: String = row.get("updated_at");

    Ok(EmployeeAdvance {
        id: parse_id(&id_str, "advance ID")?,
        employee_id: row.get("employee_id"),
        employee_name: row.get("employee_name"),
        amount: row.get("amount"),
        date: parse_date(&date_str, "advance")?,
        notes: row.get("notes"),
        account_id: parse_id(&account_id_str, "account ID")?,
        account_name: row.get("account_name"),
        remaining_amount: row.get("remaining_amount"),
        repayments: Vec::new(),
        created_at: parse_timestamp(&created_at_str, "created_at")?,
        updated_at: parse_timestamp(&updated_at_str, "updated_at")?,
    })
}

fn row_to_repayment(row: &SqliteRow) -> Result<AdvanceRepayment> {
    let id_str: String = row.get("id");
    let date_str: String = row.get("date");
    let created_at_str: String = row.get("created_at");

    Ok(AdvanceRepayment {
        id: parse_id(&id_str, "repayment ID")?,
        amount: row.get("amount"),
        date: parse_date(&date_str, "repayment")?,
        recorded_by: row.get("recorded_by"),
        created_at: parse_timestamp(&created_at_str, "created_at")?,
    })
}
