use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::{
    InvestmentInput, LedgerService, NewTransaction, Principal, Session,
};
use crate::domain::{Account, Category, CategoryKind, InvestmentKind, format_cents, parse_cents};
use crate::store::DocumentStore;

/// Rokda - Personal Finance Tracker
#[derive(Parser)]
#[command(name = "rokda")]
#[command(about = "Track accounts, categories, transactions and investments")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "rokda.db")]
    pub database: String,

    /// Email identifying the acting user profile (created on first use)
    #[arg(short, long, global = true, default_value = "local@rokda")]
    pub user: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Monthly income/expense totals and portfolio overview
    Dashboard {
        /// Month (1-12, defaults to current)
        #[arg(short, long)]
        month: Option<u32>,

        /// Year (defaults to current)
        #[arg(short, long)]
        year: Option<i32>,
    },

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Category management commands
    #[command(subcommand)]
    Category(CategoryCommands),

    /// Record a transaction against an account
    Add {
        /// Amount (e.g. "300" or "49.99"), always positive
        amount: String,

        /// Account name
        #[arg(long)]
        account: String,

        /// Category name (its kind decides credit vs. debit)
        #[arg(long)]
        category: String,

        /// Description of the transaction
        #[arg(short = 'm', long)]
        description: Option<String>,

        /// Date of the transaction (YYYY-MM-DD, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// List recent transactions
    Transactions {
        /// Maximum number of transactions to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Delete a transaction and undo its balance effect
    Revert {
        /// Transaction ID
        id: String,
    },

    /// Investment management commands
    #[command(subcommand)]
    Investment(InvestmentCommands),

    /// Delete every document owned by the acting user
    Wipe {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Create a new account
    Add {
        /// Account name
        name: String,

        /// Account type (free text, e.g. "Savings", "Cash")
        #[arg(short, long, default_value = "Savings")]
        kind: String,

        /// Opening balance (e.g. "1000.00")
        #[arg(short, long, default_value = "0")]
        balance: String,
    },

    /// List accounts with balances
    List,

    /// Rename or retype an account
    Edit {
        /// Current account name
        name: String,

        /// New name
        #[arg(long)]
        rename: Option<String>,

        /// New type
        #[arg(long)]
        kind: Option<String>,
    },

    /// Delete an account (refused while transactions reference it)
    Rm {
        /// Account name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Create a new category
    Add {
        /// Category name
        name: String,

        /// Income or Expense
        #[arg(short, long)]
        kind: String,
    },

    /// List categories
    List,

    /// Rename a category or flip its kind
    Edit {
        /// Current category name
        name: String,

        /// New name
        #[arg(long)]
        rename: Option<String>,

        /// New kind (Income or Expense)
        #[arg(long)]
        kind: Option<String>,
    },

    /// Delete a category (refused while transactions reference it)
    Rm {
        /// Category name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum InvestmentCommands {
    /// Record a new investment position
    Add {
        /// Investment name (e.g. ticker or scheme)
        name: String,

        /// Equity, MutualFund, Bond or Deposit
        #[arg(short, long, default_value = "Equity")]
        kind: String,

        /// Units held (ignored for Bond/Deposit)
        #[arg(short, long, default_value = "1")]
        quantity: f64,

        /// Purchase price per unit (e.g. "150.00")
        #[arg(short, long)]
        price: String,

        /// Current value of the whole position
        #[arg(short = 'v', long)]
        value: String,

        /// Purchase date (YYYY-MM-DD, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// List investments with profit/loss
    List,

    /// Delete an investment position
    Rm {
        /// Investment ID
        id: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        if matches!(self.command, Commands::Init) {
            LedgerService::init(&self.database).await?;
            println!("Initialized database at {}", self.database);
            return Ok(());
        }

        let service = LedgerService::open(&self.database)
            .await
            .with_context(|| format!("Failed to open database at {}", self.database))?;

        // The CLI identifies the acting principal by email; credential
        // checks live with the identity provider, not here.
        let principal = Principal {
            auth_id: self.user.clone(),
            name: self
                .user
                .split('@')
                .next()
                .unwrap_or(self.user.as_str())
                .to_string(),
            email: self.user.clone(),
        };
        let user = service.ensure_user(&principal).await?;
        let session = Session::for_user(&user);

        match self.command {
            Commands::Init => unreachable!("handled above"),

            Commands::Dashboard { month, year } => {
                let now = Utc::now();
                let month = month.unwrap_or_else(|| now.month());
                let year = year.unwrap_or_else(|| now.year());
                let summary = service.monthly_summary(session, month, year).await?;

                println!("Dashboard for {:02}/{}", summary.month, summary.year);
                println!("  Income:     {}", format_cents(summary.totals.income));
                println!("  Expense:    {}", format_cents(summary.totals.expense));
                println!("  Net:        {}", format_cents(summary.totals.net()));
                println!(
                    "  Portfolio:  {} (invested {})",
                    format_cents(summary.portfolio.current_value),
                    format_cents(summary.portfolio.invested)
                );
            }

            Commands::Account(cmd) => run_account(&service, session, cmd).await?,
            Commands::Category(cmd) => run_category(&service, session, cmd).await?,

            Commands::Add {
                amount,
                account,
                category,
                description,
                date,
            } => {
                let amount = parse_cents(&amount).context("Invalid amount")?;
                let account = resolve_account(&service, session, &account).await?;
                let category = resolve_category(&service, session, &category).await?;
                let transaction_date = match date {
                    Some(d) => parse_date(&d)?,
                    None => Utc::now(),
                };

                let outcome = service
                    .record_transaction(
                        session,
                        NewTransaction {
                            account_id: account.id,
                            category_id: category.id,
                            amount,
                            description,
                            transaction_date,
                        },
                    )
                    .await?;

                println!(
                    "Recorded {} {} on {} (balance now {})",
                    category.kind,
                    format_cents(outcome.transaction.amount),
                    account.name,
                    format_cents(outcome.account_balance)
                );
                println!("  id: {}", outcome.transaction.id);
            }

            Commands::Transactions { limit } => {
                let transactions = service.list_transactions(session, limit).await?;
                let accounts = service.list_accounts(session).await?;
                let categories = service.list_categories(session).await?;

                if transactions.is_empty() {
                    println!("No transactions found");
                    return Ok(());
                }

                for tx in transactions {
                    let category = categories.iter().find(|c| c.id == tx.category_id);
                    let account = accounts.iter().find(|a| a.id == tx.account_id);
                    let sign = match category.map(|c| c.kind) {
                        Some(CategoryKind::Expense) => "-",
                        _ => "+",
                    };

                    println!(
                        "{}  {}{:>12}  {:<16} {:<16} {}  {}",
                        tx.transaction_date.format("%Y-%m-%d %H:%M"),
                        sign,
                        format_cents(tx.amount),
                        category.map_or("Unknown", |c| c.name.as_str()),
                        account.map_or("Unknown", |a| a.name.as_str()),
                        tx.description.as_deref().unwrap_or("-"),
                        tx.id,
                    );
                }
            }

            Commands::Revert { id } => {
                let id = parse_id(&id)?;
                let outcome = service.revert_transaction(session, id).await?;
                match outcome.account_balance {
                    Some(balance) => println!(
                        "Reverted {} (balance now {})",
                        outcome.transaction_id,
                        format_cents(balance)
                    ),
                    None => println!(
                        "Deleted {} (account or category no longer exists; balance untouched)",
                        outcome.transaction_id
                    ),
                }
            }

            Commands::Investment(cmd) => run_investment(&service, session, cmd).await?,

            Commands::Wipe { yes } => {
                if !yes {
                    println!("This deletes every document owned by {}. Re-run with --yes.", user.email);
                    return Ok(());
                }
                let summary = service.delete_user_data(user.id).await?;
                println!(
                    "Wiped {} transactions, {} accounts, {} categories, {} investments",
                    summary.transactions, summary.accounts, summary.categories, summary.investments
                );
            }
        }

        Ok(())
    }
}

async fn run_account<S: DocumentStore>(
    service: &LedgerService<S>,
    session: Session,
    cmd: AccountCommands,
) -> Result<()> {
    match cmd {
        AccountCommands::Add { name, kind, balance } => {
            let balance = parse_cents(&balance).context("Invalid balance")?;
            let account = service.create_account(session, &name, &kind, balance).await?;
            println!(
                "Created account {} ({}) with balance {}",
                account.name,
                account.kind,
                format_cents(account.balance)
            );
        }
        AccountCommands::List => {
            let accounts = service.list_accounts(session).await?;
            if accounts.is_empty() {
                println!("No accounts found");
                return Ok(());
            }
            for account in accounts {
                println!(
                    "{:<20} {:<12} {:>12}  {}",
                    account.name,
                    account.kind,
                    format_cents(account.balance),
                    account.id
                );
            }
        }
        AccountCommands::Edit { name, rename, kind } => {
            let account = resolve_account(service, session, &name).await?;
            let updated = service
                .update_account(session, account.id, rename.as_deref(), kind.as_deref())
                .await?;
            println!("Updated account {} ({})", updated.name, updated.kind);
        }
        AccountCommands::Rm { name } => {
            let account = resolve_account(service, session, &name).await?;
            service.delete_account(session, account.id).await?;
            println!("Deleted account {}", account.name);
        }
    }
    Ok(())
}

async fn run_category<S: DocumentStore>(
    service: &LedgerService<S>,
    session: Session,
    cmd: CategoryCommands,
) -> Result<()> {
    match cmd {
        CategoryCommands::Add { name, kind } => {
            let kind = parse_category_kind(&kind)?;
            let category = service.create_category(session, &name, kind).await?;
            println!("Created category {} ({})", category.name, category.kind);
        }
        CategoryCommands::List => {
            let categories = service.list_categories(session).await?;
            if categories.is_empty() {
                println!("No categories found");
                return Ok(());
            }
            for category in categories {
                println!("{:<20} {:<8} {}", category.name, category.kind, category.id);
            }
        }
        CategoryCommands::Edit { name, rename, kind } => {
            let category = resolve_category(service, session, &name).await?;
            let kind = kind.as_deref().map(parse_category_kind).transpose()?;
            let updated = service
                .update_category(session, category.id, rename.as_deref(), kind)
                .await?;
            println!("Updated category {} ({})", updated.name, updated.kind);
        }
        CategoryCommands::Rm { name } => {
            let category = resolve_category(service, session, &name).await?;
            service.delete_category(session, category.id).await?;
            println!("Deleted category {}", category.name);
        }
    }
    Ok(())
}

async fn run_investment<S: DocumentStore>(
    service: &LedgerService<S>,
    session: Session,
    cmd: InvestmentCommands,
) -> Result<()> {
    match cmd {
        InvestmentCommands::Add {
            name,
            kind,
            quantity,
            price,
            value,
            date,
        } => {
            let kind = InvestmentKind::from_str(&kind)
                .with_context(|| format!("Unknown investment kind: {} (expected Equity, MutualFund, Bond or Deposit)", kind))?;
            let purchase_price = parse_cents(&price).context("Invalid price")?;
            let current_value = parse_cents(&value).context("Invalid value")?;
            let purchase_date = match date {
                Some(d) => parse_date(&d)?,
                None => Utc::now(),
            };

            let investment = service
                .create_investment(
                    session,
                    InvestmentInput {
                        name,
                        kind,
                        quantity,
                        purchase_price,
                        current_value,
                        purchase_date,
                        closed_at: None,
                    },
                )
                .await?;
            println!(
                "Created {} ({}), invested {}",
                investment.name,
                investment.kind,
                format_cents(investment.invested())
            );
        }
        InvestmentCommands::List => {
            let investments = service.list_investments(session).await?;
            if investments.is_empty() {
                println!("No investments found");
                return Ok(());
            }
            for inv in &investments {
                let pnl = inv.current_value - inv.invested();
                println!(
                    "{:<20} {:<10} qty {:<8} in {:>12} now {:>12} p/l {:>12}  {}",
                    inv.name,
                    inv.kind,
                    inv.quantity,
                    format_cents(inv.invested()),
                    format_cents(inv.current_value),
                    format_cents(pnl),
                    inv.id
                );
            }
            let summary = service.portfolio(session).await?;
            println!(
                "Total: invested {}, current {}, p/l {}",
                format_cents(summary.invested),
                format_cents(summary.current_value),
                format_cents(summary.profit_loss())
            );
        }
        InvestmentCommands::Rm { id } => {
            let id = parse_id(&id)?;
            service.delete_investment(session, id).await?;
            println!("Deleted investment {}", id);
        }
    }
    Ok(())
}

async fn resolve_account<S: DocumentStore>(
    service: &LedgerService<S>,
    session: Session,
    name: &str,
) -> Result<Account> {
    service
        .list_accounts(session)
        .await?
        .into_iter()
        .find(|a| a.name == name)
        .with_context(|| format!("Account not found: {}", name))
}

async fn resolve_category<S: DocumentStore>(
    service: &LedgerService<S>,
    session: Session,
    name: &str,
) -> Result<Category> {
    service
        .list_categories(session)
        .await?
        .into_iter()
        .find(|c| c.name == name)
        .with_context(|| format!("Category not found: {}", name))
}

fn parse_category_kind(input: &str) -> Result<CategoryKind> {
    CategoryKind::from_str(input)
        .with_context(|| format!("Unknown category kind: {} (expected Income or Expense)", input))
}

fn parse_date(input: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .with_context(|| format!("Invalid date: {} (expected YYYY-MM-DD)", input))?;
    Ok(date
        .and_hms_opt(0, 0, 0)
        .context("Invalid time")?
        .and_utc())
}

fn parse_id(input: &str) -> Result<Uuid> {
    Uuid::parse_str(input).with_context(|| format!("Invalid id: {}", input))
}
