use anyhow::{bail, Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use site_ledger::export::{
    expense_template, payroll_file_name, payroll_workbook, profit_file_name, profit_workbook,
    TEMPLATE_FILE_NAME,
};
use site_ledger::helpers::{format_currency, format_currency_short, format_md};
use site_ledger::import::{
    assign_expense_sites, import_expenses, import_sites, import_work_logs, read_path, Imported,
    Sheet,
};
use site_ledger::{
    payroll_report, site_stats, AppConfig, AppStore, Notice, NoticeLevel, PayrollFilter,
    Snapshot, SqliteRowStore, SyncOutcome,
};

/// Labor, payroll and expense ledger for construction sites
#[derive(Parser, Debug)]
#[command(name = "site-ledger")]
#[command(about = "Work logs, payroll and site expenses for construction labor", long_about = None)]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "SITE_LEDGER_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database (overrides the config file)
    #[arg(long, env = "SITE_LEDGER_DB")]
    database: Option<PathBuf>,

    /// Origin tag for changes made by this process
    #[arg(long, env = "SITE_LEDGER_CLIENT_ID")]
    client_id: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print entity counts and per-site totals
    Summary,

    /// Add or update sites from a CSV/XLSX sheet
    ImportSites { file: PathBuf },

    /// Register expenses from a CSV/XLSX sheet
    ImportExpenses { file: PathBuf },

    /// Merge work logs from a payroll CSV/XLSX export
    ImportWorkLogs { file: PathBuf },

    /// Fill in missing expense sites from same-day work logs
    AssignExpenseSites,

    /// Write the payroll workbook
    ExportPayroll {
        /// Month as YYYY-MM; omit for every month
        #[arg(long)]
        month: Option<String>,

        /// Only sites of this company
        #[arg(long)]
        company: Option<String>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write the per-site profit workbook
    ExportProfit {
        /// Case-insensitive site name filter
        #[arg(long)]
        search: Option<String>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write the blank expense upload template
    ExpenseTemplate {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "site_ledger=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = AppConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(db) = args.database {
        config.database_path = db;
    }
    if let Some(id) = args.client_id {
        config.client_id = id;
    }

    match args.command {
        Command::Summary => print_summary(&open_store(&config).await?.snapshot()),
        Command::ImportSites { file } => {
            let sheet = read_sheet(&file)?;
            let store = open_store(&config).await?;
            apply_import(&store, |s| import_sites(s, &sheet)).await?;
        }
        Command::ImportExpenses { file } => {
            let sheet = read_sheet(&file)?;
            let store = open_store(&config).await?;
            let today = Local::now().date_naive();
            apply_import(&store, |s| import_expenses(s, &sheet, today)).await?;
        }
        Command::ImportWorkLogs { file } => {
            let sheet = read_sheet(&file)?;
            let store = open_store(&config).await?;
            let rate = config.import.default_daily_rate;
            apply_import(&store, |s| import_work_logs(s, &sheet, rate)).await?;
        }
        Command::AssignExpenseSites => {
            let store = open_store(&config).await?;
            apply_import(&store, |s| Ok(assign_expense_sites(s))).await?;
        }
        Command::ExportPayroll {
            month,
            company,
            output,
        } => {
            let mut filter = PayrollFilter::new();
            let mut default_name = String::from("출력현황_전체.xlsx");
            if let Some(month) = month {
                let (year, m) = parse_month(&month)?;
                filter = filter.month(year, m);
                default_name = payroll_file_name(year, m);
            }
            if let Some(company) = company {
                filter = filter.company(&company);
            }

            let store = open_store(&config).await?;
            let report = payroll_report(&store.snapshot(), &filter);
            println!(
                "🧾 {} rows · {} man-days · gross {} · tax {} · net {}",
                report.rows.len(),
                format_md(report.totals.md),
                format_currency(report.totals.gross),
                format_currency(report.totals.tax),
                format_currency(report.totals.net)
            );
            let path = output.unwrap_or_else(|| PathBuf::from(default_name));
            write_file(&path, payroll_workbook(&report)?)?;
        }
        Command::ExportProfit { search, output } => {
            let store = open_store(&config).await?;
            let stats = site_stats(&store.snapshot(), search.as_deref());
            let path = output.unwrap_or_else(|| PathBuf::from(profit_file_name(Local::now().date_naive())));
            write_file(&path, profit_workbook(&stats)?)?;
        }
        Command::ExpenseTemplate { output } => {
            let path = output.unwrap_or_else(|| PathBuf::from(TEMPLATE_FILE_NAME));
            write_file(&path, expense_template()?)?;
        }
    }

    Ok(())
}

async fn open_store(config: &AppConfig) -> Result<AppStore> {
    let remote = SqliteRowStore::open(&config.database_path, &config.client_id)
        .with_context(|| format!("Failed to open {}", config.database_path.display()))?;
    let store = AppStore::new(Arc::new(remote), config.sync.clone());

    println!("📂 Loading {}...", config.database_path.display());
    store.load().await.context("Failed to load data")?;
    Ok(store)
}

fn read_sheet(path: &Path) -> Result<Sheet> {
    let sheet = read_path(path).with_context(|| format!("Failed to read {}", path.display()))?;
    println!("✓ Read {} rows from {}", sheet.rows.len(), path.display());
    Ok(sheet)
}

/// Run an import against the latest snapshot and wait for its sync
async fn apply_import<F>(store: &AppStore, import: F) -> Result<()>
where
    F: FnOnce(&Snapshot) -> site_ledger::Result<Imported>,
{
    let mut summary = None;
    let ticket = store.try_update(|snapshot| {
        let imported = import(snapshot)?;
        summary = Some(imported.summary);
        Ok(imported.snapshot)
    })?;

    let Some(summary) = summary else {
        bail!("import produced no summary");
    };
    print_notice(&summary.notice());
    if summary.skipped > 0 {
        println!("   ⚠️  {} rows skipped", summary.skipped);
    }
    if summary.created_sites + summary.created_workers > 0 {
        println!(
            "   ➕ {} new sites, {} new workers",
            summary.created_sites, summary.created_workers
        );
    }

    println!("\n💾 Syncing version {}...", ticket.version);
    match ticket.wait().await {
        SyncOutcome::Synced(s) => println!("✓ {} rows written", s.total_writes()),
        SyncOutcome::NoChanges => println!("✓ Nothing to write"),
        SyncOutcome::Failed { error } => bail!("sync failed: {}", error),
        SyncOutcome::Pending => bail!("sync did not finish"),
    }
    Ok(())
}

fn print_notice(notice: &Notice) {
    let icon = match notice.level {
        NoticeLevel::Success => "✅",
        NoticeLevel::Info => "ℹ️ ",
        NoticeLevel::Error => "❌",
    };
    println!("{} {}", icon, notice.message);
}

fn print_summary(snapshot: &Snapshot) {
    println!("\n📊 Summary");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for (table, count) in snapshot.counts() {
        println!("  {:<14} {:>6}", table.name(), count);
    }

    let stats = site_stats(snapshot, None);
    if stats.is_empty() {
        return;
    }
    println!("\n🏗️  Sites");
    for s in &stats {
        println!(
            "  {} / {}  budget {}  cost {}  profit {}  ({:.0}%)",
            s.company_name,
            s.name,
            format_currency_short(s.budget),
            format_currency_short(s.total_cost),
            format_currency_short(s.profit),
            s.spent_percent()
        );
    }
}

/// "YYYY-MM" → (year, month)
fn parse_month(text: &str) -> Result<(i32, u32)> {
    let date = NaiveDate::parse_from_str(&format!("{}-01", text.trim()), "%Y-%m-%d")
        .with_context(|| format!("Invalid month '{}', expected YYYY-MM", text))?;
    Ok((date.year(), date.month()))
}

fn write_file(path: &Path, bytes: Vec<u8>) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("✅ Saved {}", path.display());
    Ok(())
}
