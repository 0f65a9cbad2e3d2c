use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Days, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::{AdvanceRequest, LedgerService};
use crate::domain::{
    Account, AccountId, AccountType, Actor, AdvanceIssue, Amount, EmployeeAdvance, Expense, LedgerFilter,
    SourceType, format_amount, parse_amount,
};

/// Cashbook - account ledger and cash-flow reconciliation
#[derive(Parser)]
#[command(name = "cashbook")]
#[command(about = "Account balances, cash history, transfers, employee advances and expenses")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "CASHBOOK_DATABASE", default_value = "cashbook.db")]
    pub database: String,

    /// User id recorded on every ledger entry
    #[arg(long, env = "CASHBOOK_ACTOR_ID", global = true)]
    pub actor_id: Option<String>,

    /// Display name recorded next to the user id
    #[arg(long, env = "CASHBOOK_ACTOR_NAME", global = true)]
    pub actor_name: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Move money between two payment accounts
    Transfer {
        /// Amount to transfer (e.g., "30,000" or "30000.50")
        amount: String,

        /// Source account name
        #[arg(long)]
        from: String,

        /// Destination account name
        #[arg(long)]
        to: String,

        /// Description of the transfer
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Reverse a transfer with an equal and opposite one
    Reverse {
        /// Transfer reference
        reference: String,
    },

    /// Employee advance commands
    #[command(subcommand)]
    Advance(AdvanceCommands),

    /// Expense commands
    #[command(subcommand)]
    Expense(ExpenseCommands),

    /// Manual cash movements
    #[command(subcommand)]
    Cash(CashCommands),

    /// Show an account's cash history with the balance after each entry
    History {
        /// Account name; all accounts when omitted
        #[arg(long)]
        account: Option<String>,

        /// Filter from date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Filter to date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Filter by source type (e.g., transfer_in, expense_payment)
        #[arg(long)]
        source: Option<String>,

        /// Include entries of settled advances
        #[arg(long)]
        all: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Verify that every balance matches its ledger
    Check,
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Create a new account
    Create {
        /// Account name (must be unique)
        name: String,

        /// Account type: asset, liability, equity, revenue, expense
        #[arg(short = 't', long = "type", default_value = "asset")]
        account_type: String,

        /// Opening balance
        #[arg(short, long, default_value = "0")]
        initial: String,

        /// Allow or forbid transfers (defaults to true for assets)
        #[arg(long)]
        payment: Option<bool>,
    },

    /// List all accounts
    List,

    /// Show account details
    Show {
        /// Account name
        name: String,
    },

    /// Change the opening balance
    SetInitial {
        /// Account name
        name: String,

        /// New opening balance
        amount: String,
    },

    /// Bring the balance to a counted value, posting the difference
    Correct {
        /// Account name
        name: String,

        /// Target balance
        amount: String,

        /// Reason recorded on the correction entry
        #[arg(short, long)]
        reason: String,
    },

    /// Delete an account without ledger history
    Delete {
        /// Account name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum AdvanceCommands {
    /// Issue an advance from a funding account
    Issue {
        /// Amount to advance
        amount: String,

        /// Employee id
        #[arg(long)]
        employee: String,

        /// Employee display name (defaults to the id)
        #[arg(long)]
        name: Option<String>,

        /// Funding account name
        #[arg(long)]
        account: String,

        /// Date of the advance (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Record a repayment
    Repay {
        /// Advance id
        id: String,

        /// Amount repaid
        amount: String,

        /// Date of the repayment (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// List advances
    List {
        /// Only advances with something still owed
        #[arg(long)]
        active: bool,
    },

    /// Show an advance and its repayments
    Show {
        /// Advance id
        id: String,
    },

    /// Delete an advance, reimbursing its funding account
    Delete {
        /// Advance id
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// Record an expense paid from an account
    Record {
        /// Amount paid
        amount: String,

        /// Paying account name
        #[arg(long)]
        account: String,

        /// What the expense was for
        #[arg(short, long)]
        description: String,

        /// Category (e.g., "ink", "paper", "utilities")
        #[arg(short, long)]
        category: Option<String>,

        /// Date of the expense (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// List expenses
    List,

    /// Delete an expense, reimbursing its account
    Delete {
        /// Expense id
        id: String,
    },
}

#[derive(Subcommand)]
pub enum CashCommands {
    /// Record money coming into an account
    In {
        amount: String,

        #[arg(long)]
        account: String,

        #[arg(short, long, default_value = "Cash in")]
        description: String,
    },

    /// Record money leaving an account
    Out {
        amount: String,

        #[arg(long)]
        account: String,

        #[arg(short, long, default_value = "Cash out")]
        description: String,
    },
}

impl Cli {
    fn actor(&self) -> Actor {
        match (&self.actor_id, &self.actor_name) {
            (Some(id), Some(name)) => Actor::new(id.clone(), name.clone()),
            (Some(id), None) => Actor::new(id.clone(), id.clone()),
            _ => Actor::system(),
        }
    }

    pub async fn run(self) -> Result<()> {
        let actor = self.actor();

        if let Commands::Init = self.command {
            LedgerService::init(&self.database).await?;
            println!("Database initialized: {}", self.database);
            return Ok(());
        }

        let service = LedgerService::connect(&self.database).await?;

        match self.command {
            Commands::Init => {}

            Commands::Account(cmd) => run_account_command(&service, cmd, &actor).await?,

            Commands::Transfer {
                amount,
                from,
                to,
                description,
            } => {
                let amount = parse_money(&amount)?;
                let from = service.find_account(&from).await?;
                let to = service.find_account(&to).await?;
                let description =
                    description.unwrap_or_else(|| format!("Transfer {} to {}", from.name, to.name));

                let result = service
                    .transfer(from.id, to.id, amount, description, &actor)
                    .await?;
                println!(
                    "Transferred {}: {} -> {} ({})",
                    format_amount(amount),
                    result.from_account.name,
                    result.to_account.name,
                    result.reference
                );
            }

            Commands::Reverse { reference } => {
                let reference = parse_id(&reference, "transfer reference")?;
                let result = service.reverse_transfer(reference, &actor).await?;
                println!(
                    "Reversed {}: {} -> {} ({})",
                    format_amount(result.outflow.amount),
                    result.from_account.name,
                    result.to_account.name,
                    result.reference
                );
            }

            Commands::Advance(cmd) => run_advance_command(&service, cmd, &actor).await?,

            Commands::Expense(cmd) => run_expense_command(&service, cmd, &actor).await?,

            Commands::Cash(cmd) => run_cash_command(&service, cmd, &actor).await?,

            Commands::History {
                account,
                from,
                to,
                source,
                all,
                json,
            } => {
                run_history_command(&service, account, from, to, source, all, json).await?;
            }

            Commands::Check => run_check_command(&service).await?,
        }

        Ok(())
    }
}

async fn run_account_command(
    service: &LedgerService,
    cmd: AccountCommands,
    actor: &Actor,
) -> Result<()> {
    match cmd {
        AccountCommands::Create {
            name,
            account_type,
            initial,
            payment,
        } => {
            let account_type: AccountType = account_type.parse().map_err(|e| {
                anyhow::anyhow!(
                    "Invalid account type '{}'. Valid types: asset, liability, equity, revenue, expense. Error: {}",
                    account_type,
                    e
                )
            })?;
            let initial = parse_signed_money(&initial)?;

            let account = service
                .create_account(name, account_type, initial, payment)
                .await?;
            println!(
                "Created account: {} ({}, balance {})",
                account.name,
                account.account_type,
                format_amount(account.balance)
            );
        }

        AccountCommands::List => {
            let accounts = service.list_accounts().await?;
            if accounts.is_empty() {
                println!("No accounts found.");
            } else {
                println!(
                    "{:<20} {:<10} {:>16} {:<8}",
                    "NAME", "TYPE", "BALANCE", "PAYMENT"
                );
                println!("{}", "-".repeat(57));
                for account in accounts {
                    println!(
                        "{:<20} {:<10} {:>16} {:<8}",
                        truncate(&account.name, 20),
                        account.account_type,
                        format_amount(account.balance),
                        if account.is_payment_account { "yes" } else { "no" }
                    );
                }
            }
        }

        AccountCommands::Show { name } => {
            let account = service.find_account(&name).await?;
            print_account(&account);
        }

        AccountCommands::SetInitial { name, amount } => {
            let account = service.find_account(&name).await?;
            let amount = parse_signed_money(&amount)?;
            let account = service.set_initial_balance(account.id, amount).await?;
            println!(
                "Initial balance of {} set to {} (balance now {})",
                account.name,
                format_amount(account.initial_balance),
                format_amount(account.balance)
            );
        }

        AccountCommands::Correct {
            name,
            amount,
            reason,
        } => {
            let account = service.find_account(&name).await?;
            let target = parse_signed_money(&amount)?;
            match service
                .correct_balance(account.id, target, &reason, actor)
                .await?
            {
                Some(movement) => println!(
                    "Posted {} of {} on {} (balance now {})",
                    movement.entry.source_type,
                    format_amount(movement.entry.amount),
                    movement.account.name,
                    format_amount(movement.account.balance)
                ),
                None => println!("{} already at {}", account.name, format_amount(target)),
            }
        }

        AccountCommands::Delete { name } => {
            let account = service.find_account(&name).await?;
            service.delete_account(account.id).await?;
            println!("Deleted account: {}", account.name);
        }
    }
    Ok(())
}

fn print_account(account: &Account) {
    println!("Account: {}", account.name);
    println!("  ID:              {}", account.id);
    println!("  Type:            {}", account.account_type);
    println!("  Balance:         {}", format_amount(account.balance));
    println!("  Initial balance: {}", format_amount(account.initial_balance));
    println!(
        "  Payment account: {}",
        if account.is_payment_account { "yes" } else { "no" }
    );
    println!("  Mutations:       {}", account.version);
    println!(
        "  Created:         {}",
        account.created_at.format("%Y-%m-%d %H:%M:%S")
    );
}

async fn run_advance_command(
    service: &LedgerService,
    cmd: AdvanceCommands,
    actor: &Actor,
) -> Result<()> {
    match cmd {
        AdvanceCommands::Issue {
            amount,
            employee,
            name,
            account,
            date,
            notes,
        } => {
            let amount = parse_money(&amount)?;
            let account = service.find_account(&account).await?;
            let request = AdvanceRequest {
                employee_name: name.unwrap_or_else(|| employee.clone()),
                employee_id: employee,
                amount,
                date: parse_day_or_today(date)?,
                account_id: account.id,
                notes,
            };

            let advance = service.issue_advance(request, actor).await?;
            println!(
                "Issued advance {} of {} to {} from {}",
                advance.id,
                format_amount(advance.amount),
                advance.employee_name,
                advance.account_name
            );
        }

        AdvanceCommands::Repay { id, amount, date } => {
            let id = parse_id(&id, "advance ID")?;
            let amount = parse_money(&amount)?;
            let advance = service
                .repay_advance(id, amount, parse_day_or_today(date)?, actor)
                .await?;
            println!(
                "Recorded repayment of {} (remaining {}, {})",
                format_amount(amount),
                format_amount(advance.remaining_amount),
                advance.status()
            );
        }

        AdvanceCommands::List { active } => {
            let advances = service.list_advances(active).await?;
            if advances.is_empty() {
                println!("No advances found.");
            } else {
                println!(
                    "{:<36} {:<12} {:<18} {:>14} {:>14} {:<8}",
                    "ID", "DATE", "EMPLOYEE", "AMOUNT", "REMAINING", "STATUS"
                );
                println!("{}", "-".repeat(107));
                for advance in advances {
                    println!(
                        "{:<36} {:<12} {:<18} {:>14} {:>14} {:<8}",
                        advance.id,
                        advance.date.format("%Y-%m-%d"),
                        truncate(&advance.employee_name, 18),
                        format_amount(advance.amount),
                        format_amount(advance.remaining_amount),
                        advance.status()
                    );
                }
            }
        }

        AdvanceCommands::Show { id } => {
            let id = parse_id(&id, "advance ID")?;
            let advance = service.get_advance(id).await?;
            print_advance(&advance);
        }

        AdvanceCommands::Delete { id } => {
            let id = parse_id(&id, "advance ID")?;
            let advance = service.get_advance(id).await?;
            service.delete_advance(id, actor).await?;
            println!(
                "Deleted advance {}; reimbursed {} to {}",
                advance.id,
                format_amount(advance.amount),
                advance.account_name
            );
        }
    }
    Ok(())
}

fn print_advance(advance: &EmployeeAdvance) {
    println!("Advance: {}", advance.id);
    println!(
        "  Employee:   {} ({})",
        advance.employee_name, advance.employee_id
    );
    println!("  Date:       {}", advance.date.format("%Y-%m-%d"));
    println!("  Amount:     {}", format_amount(advance.amount));
    println!("  Remaining:  {}", format_amount(advance.remaining_amount));
    println!("  Status:     {}", advance.status());
    println!("  Account:    {}", advance.account_name);
    if let Some(notes) = &advance.notes {
        println!("  Notes:      {}", notes);
    }
    if !advance.repayments.is_empty() {
        println!();
        println!("  Repayments:");
        for repayment in &advance.repayments {
            println!(
                "    - {} on {} by {}",
                format_amount(repayment.amount),
                repayment.date.format("%Y-%m-%d"),
                repayment.recorded_by
            );
        }
    }
}

async fn run_expense_command(
    service: &LedgerService,
    cmd: ExpenseCommands,
    actor: &Actor,
) -> Result<()> {
    match cmd {
        ExpenseCommands::Record {
            amount,
            account,
            description,
            category,
            date,
        } => {
            let amount = parse_money(&amount)?;
            let account = service.find_account(&account).await?;
            let mut expense = Expense::new(
                description,
                amount,
                account.id,
                account.name,
                parse_day_or_today(date)?,
            );
            if let Some(category) = category {
                expense = expense.with_category(category);
            }

            let expense = service.record_expense(expense, actor).await?;
            println!(
                "Recorded expense {}: {} from {}",
                expense.id,
                format_amount(expense.amount),
                expense.account_name
            );
        }

        ExpenseCommands::List => {
            let expenses = service.list_expenses().await?;
            if expenses.is_empty() {
                println!("No expenses found.");
            } else {
                println!(
                    "{:<36} {:<12} {:>14} {:<15} {:<12} DESCRIPTION",
                    "ID", "DATE", "AMOUNT", "ACCOUNT", "CATEGORY"
                );
                println!("{}", "-".repeat(104));
                for expense in expenses {
                    println!(
                        "{:<36} {:<12} {:>14} {:<15} {:<12} {}",
                        expense.id,
                        expense.date.format("%Y-%m-%d"),
                        format_amount(expense.amount),
                        truncate(&expense.account_name, 15),
                        truncate(expense.category.as_deref().unwrap_or("-"), 12),
                        truncate(&expense.description, 30)
                    );
                }
            }
        }

        ExpenseCommands::Delete { id } => {
            let id = parse_id(&id, "expense ID")?;
            let expense = service.get_expense(id).await?;
            service.delete_expense(id, actor).await?;
            println!(
                "Deleted expense {}; reimbursed {} to {}",
                expense.id,
                format_amount(expense.amount),
                expense.account_name
            );
        }
    }
    Ok(())
}

async fn run_cash_command(service: &LedgerService, cmd: CashCommands, actor: &Actor) -> Result<()> {
    let movement = match cmd {
        CashCommands::In {
            amount,
            account,
            description,
        } => {
            let amount = parse_money(&amount)?;
            let account = service.find_account(&account).await?;
            service
                .cash_in(account.id, amount, &description, actor)
                .await?
        }
        CashCommands::Out {
            amount,
            account,
            description,
        } => {
            let amount = parse_money(&amount)?;
            let account = service.find_account(&account).await?;
            service
                .cash_out(account.id, amount, &description, actor)
                .await?
        }
    };

    println!(
        "Recorded {} of {} on {} (balance now {})",
        movement.entry.source_type,
        format_amount(movement.entry.amount),
        movement.account.name,
        format_amount(movement.account.balance)
    );
    Ok(())
}

async fn run_history_command(
    service: &LedgerService,
    account: Option<String>,
    from: Option<String>,
    to: Option<String>,
    source: Option<String>,
    include_archived: bool,
    json: bool,
) -> Result<()> {
    let account = match account {
        Some(key) => Some(service.find_account(&key).await?),
        None => None,
    };

    let from_date = from
        .map(|s| parse_date(&s))
        .transpose()
        .context("Invalid from-date")?;
    // Inclusive on the command line, exclusive in the filter.
    let to_date = to
        .map(|s| parse_date(&s).and_then(next_day))
        .transpose()
        .context("Invalid to-date")?;
    let source_type = source
        .map(|s| {
            SourceType::from_str(&s).ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid source type '{}'. Valid types: {}",
                    s,
                    SourceType::ALL.map(|t| t.as_str()).join(", ")
                )
            })
        })
        .transpose()?;

    let mut view = LedgerFilter::default().with_date_range(from_date, to_date);
    view.source_type = source_type;
    view.include_archived = include_archived;

    let rows = match &account {
        Some(account) => service.running_balances_matching(account.id, &view).await?,
        None => service.running_balances_across(&view).await?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let names: HashMap<AccountId, String> = service
        .list_accounts()
        .await?
        .into_iter()
        .map(|a| (a.id, a.name))
        .collect();

    match &account {
        Some(account) => {
            println!(
                "{} ({}): balance {}",
                account.name,
                account.account_type,
                format_amount(account.balance)
            );
            if let Some(since) = from_date {
                let opening = service.opening_balance(account.id, since).await?;
                println!(
                    "Opening balance on {}: {}",
                    since.format("%Y-%m-%d"),
                    format_amount(opening)
                );
            }
        }
        None => println!("All accounts"),
    }
    if rows.is_empty() {
        println!("No entries found.");
        return Ok(());
    }

    println!(
        "{:<17} {:<14} {:<22} {:>14} {:>16}  DESCRIPTION",
        "DATE", "ACCOUNT", "SOURCE", "AMOUNT", "BALANCE AFTER"
    );
    println!("{}", "-".repeat(115));
    for row in rows {
        let entry = &row.entry;
        let amount = format!(
            "{}{}",
            if entry.is_inflow() { "+" } else { "-" },
            format_amount(entry.amount)
        );
        let account_name = names
            .get(&entry.account_id)
            .map(|name| truncate(name, 14))
            .unwrap_or_else(|| "?".to_string());
        let mut description = truncate(&entry.description, 30);
        if entry.is_archived() {
            description.push_str(" [settled]");
        }
        println!(
            "{:<17} {:<14} {:<22} {:>14} {:>16}  {}",
            entry.created_at.format("%Y-%m-%d %H:%M"),
            account_name,
            entry.source_type,
            amount,
            format_amount(row.balance_after),
            description
        );
    }
    Ok(())
}

async fn run_check_command(service: &LedgerService) -> Result<()> {
    println!("Checking ledger integrity...\n");

    let report = service.check_integrity().await?;

    println!("Accounts: {}", report.account_count);
    println!("Entries:  {}", report.entry_count);
    println!("Advances: {}", report.advance_count);
    println!();

    if report.is_ok() {
        println!("Ledger is consistent.");
        return Ok(());
    }

    println!("Issues found:");
    for mismatch in &report.balance_mismatches {
        println!(
            "  - {}: balance {} but ledger says {} (drift {})",
            mismatch.account_name,
            format_amount(mismatch.actual),
            format_amount(mismatch.expected),
            format_amount(mismatch.drift())
        );
    }
    for issue in &report.advance_issues {
        match issue {
            AdvanceIssue::RemainingMismatch {
                advance_id,
                expected,
                actual,
            } => println!(
                "  - advance {}: remaining {} but repayments say {}",
                advance_id,
                format_amount(*actual),
                format_amount(*expected)
            ),
            AdvanceIssue::MissingIssuanceEntry { advance_id } => {
                println!("  - advance {}: active but has no issuance entry", advance_id)
            }
            AdvanceIssue::UnpurgedIssuanceEntry { advance_id } => println!(
                "  - advance {}: settled but issuance entry still active",
                advance_id
            ),
        }
    }
    if report.unknown_accounts > 0 {
        println!(
            "  - {} account(s) referenced by entries do not exist",
            report.unknown_accounts
        );
    }
    anyhow::bail!("Ledger integrity check failed");
}

fn parse_money(input: &str) -> Result<Amount> {
    let amount = parse_signed_money(input)?;
    if amount <= 0 {
        anyhow::bail!("Amount must be positive, got '{}'", input);
    }
    Ok(amount)
}

fn parse_signed_money(input: &str) -> Result<Amount> {
    parse_amount(input)
        .with_context(|| format!("Invalid amount '{}'. Use '100,000' or '1250.75'", input))
}

fn parse_id(input: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(input).with_context(|| format!("Invalid {}: {}", what, input))
}

fn parse_day(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").context("Date must be in YYYY-MM-DD format")
}

fn parse_day_or_today(date: Option<String>) -> Result<NaiveDate> {
    match date {
        Some(date_str) => parse_day(&date_str)
            .with_context(|| format!("Invalid date format '{}'. Use YYYY-MM-DD", date_str)),
        None => Ok(Utc::now().date_naive()),
    }
}

fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    let naive_datetime = parse_day(date_str)?
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow::anyhow!("Invalid date"))?;
    Ok(naive_datetime.and_utc())
}

fn next_day(date: DateTime<Utc>) -> Result<DateTime<Utc>> {
    date.checked_add_days(Days::new(1))
        .ok_or_else(|| anyhow::anyhow!("Date out of range"))
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("Kas Kecil", 20), "Kas Kecil");
        assert_eq!(truncate("Pembelian kertas HVS A4", 10), "Pembeli...");
        assert_eq!(truncate("Rp€€€€€€€€", 5), "Rp...");
    }

    #[test]
    fn test_parse_money_rejects_non_positive() {
        assert_eq!(parse_money("30,000").unwrap(), 3_000_000);
        assert!(parse_money("0").is_err());
        assert!(parse_money("-5").is_err());
        assert!(parse_money("abc").is_err());
    }

    #[test]
    fn test_to_date_is_inclusive() {
        let to = parse_date("2024-05-31").and_then(next_day).unwrap();
        assert_eq!(to, parse_date("2024-06-01").unwrap());
    }

    #[test]
    fn test_cli_parses_history() {
        let cli = Cli::try_parse_from([
            "cashbook",
            "--database",
            "test.db",
            "history",
            "--account",
            "Kas",
            "--source",
            "transfer_in",
            "--all",
        ])
        .unwrap();
        assert_eq!(cli.database, "test.db");
        match cli.command {
            Commands::History {
                account,
                source,
                all,
                json,
                ..
            } => {
                assert_eq!(account.as_deref(), Some("Kas"));
                assert_eq!(source.as_deref(), Some("transfer_in"));
                assert!(all);
                assert!(!json);
            }
            _ => panic!("expected history command"),
        }
    }

    #[test]
    fn test_history_account_is_optional() {
        let cli = Cli::try_parse_from(["cashbook", "history", "--from", "2024-05-01"]).unwrap();
        match cli.command {
            Commands::History { account, from, .. } => {
                assert!(account.is_none());
                assert_eq!(from.as_deref(), Some("2024-05-01"));
            }
            _ => panic!("expected history command"),
        }
    }
}
