use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::domain::{
    AccountId, Direction, LedgerEntry, LedgerEntryId, LedgerFilter, LedgerTotals, ReferenceId,
    SourceType,
};

use super::repository::{format_timestamp, parse_id, parse_timestamp};
use super::{LedgerEntryStore, Repository};

const ENTRY_COLUMNS: &str = "id, sequence, account_id, direction, amount, description, source_type, reference_id, created_by, created_by_name, created_at, archived_at";

impl Repository {
    async fn insert_entry(&self, entry: &LedgerEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ledger_entries (id, sequence, account_id, direction, amount, description, source_type, reference_id, created_by, created_by_name, created_at, archived_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.sequence)
        .bind(entry.account_id.to_string())
        .bind(entry.direction.as_str())
        .bind(entry.amount)
        .bind(&entry.description)
        .bind(entry.source_type.as_str())
        .bind(entry.reference_id.to_string())
        .bind(&entry.created_by)
        .bind(&entry.created_by_name)
        .bind(format_timestamp(entry.created_at))
        .bind(entry.archived_at.map(format_timestamp))
        .execute(&self.pool)
        .await
        .context("Failed to save ledger entry")?;
        Ok(())
    }
}

#[async_trait]
impl LedgerEntryStore for Repository {
    async fn append(&self, entry: &mut LedgerEntry) -> Result<()> {
        entry.direction = entry.source_type.direction();
        entry.sequence = self.next_sequence().await?;
        self.insert_entry(entry).await
    }

    async fn restore(&self, entry: &LedgerEntry) -> Result<()> {
        self.insert_entry(entry).await
    }

    async fn get_entry(&self, id: LedgerEntryId) -> Result<Option<LedgerEntry>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM ledger_entries WHERE id = ?",
            ENTRY_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch ledger entry")?;

        row.as_ref().map(row_to_entry).transpose()
    }

    async fn list_entries(&self, filter: &LedgerFilter) -> Result<Vec<LedgerEntry>> {
        let mut query = format!("SELECT {} FROM ledger_entries WHERE 1=1", ENTRY_COLUMNS);

        // Collect all string bindings first so they live long enough
        let account_id_str = filter.account_id.map(|id| id.to_string());
        let from_date_str = filter.from_date.map(format_timestamp);
        let to_date_str = filter.to_date.map(format_timestamp);

        if account_id_str.is_some() {
            query.push_str(" AND account_id = ?");
        }
        if filter.source_type.is_some() {
            query.push_str(" AND source_type = ?");
        }
        if from_date_str.is_some() {
            query.push_str(" AND created_at >= ?");
        }
        if to_date_str.is_some() {
            query.push_str(" AND created_at < ?");
        }
        if !filter.include_archived {
            query.push_str(" AND archived_at IS NULL");
        }

        query.push_str(" ORDER BY sequence DESC");

        let mut sql_query = sqlx::query(&query);

        if let Some(ref id) = account_id_str {
            sql_query = sql_query.bind(id);
        }
        if let Some(source_type) = filter.source_type {
            sql_query = sql_query.bind(source_type.as_str());
        }
        if let Some(ref from) = from_date_str {
            sql_query = sql_query.bind(from);
        }
        if let Some(ref to) = to_date_str {
            sql_query = sql_query.bind(to);
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list ledger entries")?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn find_by_reference(
        &self,
        reference_id: ReferenceId,
        source_type: SourceType,
    ) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM ledger_entries WHERE reference_id = ? AND source_type = ? ORDER BY sequence",
            ENTRY_COLUMNS
        ))
        .bind(reference_id.to_string())
        .bind(source_type.as_str())
        .fetch_all(&self.pool)
        .await
        .context("Failed to find ledger entries by reference")?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn remove(&self, id: LedgerEntryId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM ledger_entries WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to remove ledger entry")?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_by_reference(
        &self,
        reference_id: ReferenceId,
        source_type: SourceType,
    ) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM ledger_entries WHERE reference_id = ? AND source_type = ?")
                .bind(reference_id.to_string())
                .bind(source_type.as_str())
                .execute(&self.pool)
                .await
                .context("Failed to remove ledger entries by reference")?;
        Ok(result.rows_affected())
    }

    async fn archive_by_reference(
        &self,
        reference_id: ReferenceId,
        source_type: SourceType,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE ledger_entries
            SET archived_at = ?
            WHERE reference_id = ? AND source_type = ? AND archived_at IS NULL
            "#,
        )
        .bind(format_timestamp(Utc::now()))
        .bind(reference_id.to_string())
        .bind(source_type.as_str())
        .execute(&self.pool)
        .await
        .context("Failed to archive ledger entries")?;
        Ok(result.rows_affected())
    }

    async fn count_for_account(&self, account_id: AccountId) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM ledger_entries WHERE account_id = ?")
                .bind(account_id.to_string())
                .fetch_one(&self.pool)
                .await
                .context("Failed to count ledger entries")?;
        Ok(count)
    }

    async fn ledger_totals(&self) -> Result<LedgerTotals> {
        let rows = sqlx::query(
            r#"
            SELECT
                account_id,
                COUNT(*) as entries,
                COALESCE(SUM(CASE WHEN direction = 'inflow' THEN amount ELSE -amount END), 0) as net
            FROM ledger_entries
            GROUP BY account_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to aggregate ledger entries")?;

        let mut totals = LedgerTotals {
            net_by_account: HashMap::with_capacity(rows.len()),
            ..LedgerTotals::default()
        };
        for row in rows {
            let account_id_str: String = row.get("account_id");
            let entries: i64 = row.get("entries");
            totals.entry_count += entries as usize;
            totals
                .net_by_account
                .insert(parse_id(&account_id_str, "account ID")?, row.get("net"));
        }

        let references: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT reference_id FROM ledger_entries WHERE source_type = ? AND archived_at IS NULL",
        )
        .bind(SourceType::AdvanceIssuance.as_str())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list active advance issuances")?;

        totals.active_issuances = references
            .iter()
            .map(|r| parse_id(r, "reference ID"))
            .collect::<Result<_>>()?;

        Ok(totals)
    }
}

fn row_to_entry(row: &SqliteRow) -> Result<LedgerEntry> {
    let id_str: String = row.get("id");
    let account_id_str: String = row.get("account_id");
    let direction_str: String = row.get("direction");
    let source_type_str: String = row.get("source_type");
    let reference_str: String = row.get("reference_id");
    let created_at_str: String = row.get("created_at");
    let archived_at_str: Option<String> = row.get("archived_at");

    Ok(LedgerEntry {
        id: parse_id(&id_str, "ledger entry ID")?,
        sequence: row.get("sequence"),
        account_id: parse_id(&account_id_str, "account ID")?,
        direction: Direction::from_str(&direction_str)
            .ok_or_else(|| anyhow::anyhow!("Invalid direction: {}", direction_str))?,
        amount: row.get("amount"),
        description: row.get("description"),
        source_type: SourceType::from_str(&source_type_str)
            .ok_or_else(|| anyhow::anyhow!("Invalid source type: {}", source_type_str))?,
        reference_id: parse_id(&reference_str, "reference ID")?,
        created_by: row.get("created_by"),
        created_by_name: row.get("created_by_name"),
        created_at: parse_timestamp(&created_at_str, "created_at")?,
        archived_at: archived_at_str
            .map(|s| parse_timestamp(&s, "archived_at"))
            .transpose()?,
    })
}
