use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use stock_registry::data_collector::DataCollector;
use stock_registry::models::{CapTier, Config};
use stock_registry::registry::Registry;

#[derive(Parser)]
#[command(name = "stock-registry", about = "Daily registry of actively-traded US equities")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild the active universe and record today's churn
    Update(UpdateArgs),
    /// Show the stored registry without touching the network
    Status {
        /// Data directory (overrides REGISTRY_DATA_DIR)
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

#[derive(Args)]
struct UpdateArgs {
    /// Data directory (overrides REGISTRY_DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Sitemap output path (overrides REGISTRY_SITEMAP_PATH)
    #[arg(long)]
    sitemap: Option<PathBuf>,

    /// Run date in YYYY-MM-DD, defaults to today in local time
    #[arg(long, value_parser = parse_date)]
    date: Option<NaiveDate>,

    /// Only analyze the first N tickers of the master list
    #[arg(long)]
    max_tickers: Option<usize>,

    /// Number of lookups in flight
    #[arg(long)]
    concurrency: Option<usize>,
}

/// Today in the machine's local time zone
fn default_run_date() -> NaiveDate {
    Local::now().date_naive()
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("invalid date '{}': {}", s, e))
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stock_registry=info")),
        )
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("⚠️ Logging was already initialized");
    }

    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Update(args) => run_update(args).await,
        Command::Status { data_dir } => show_status(data_dir),
    };

    if let Err(e) = outcome {
        error!("Registry job failed: {:#}", e);
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run_update(args: UpdateArgs) -> Result<()> {
    let mut config = Config::from_env().context("failed to load configuration")?;
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(sitemap) = args.sitemap {
        config.sitemap_path = sitemap;
    }
    if args.max_tickers.is_some() {
        config.max_tickers = args.max_tickers;
    }
    if let Some(concurrency) = args.concurrency.filter(|n| *n > 0) {
        config.concurrency = concurrency;
    }

    let date = args.date.unwrap_or_else(default_run_date);
    let collector = DataCollector::from_config(&config)?;
    let summary = collector.run(date).await?;

    println!("📊 Universe: {} tickers as of {}", summary.universe_size, summary.date);
    println!("   ➕ Added:   {}", summary.added.len());
    println!("   ➖ Removed: {}", summary.removed.len());
    println!("   📜 Changelog entries: {}", summary.history_len);
    Ok(())
}

fn show_status(data_dir: Option<PathBuf>) -> Result<()> {
    let mut config = Config::from_env().context("failed to load configuration")?;
    if let Some(data_dir) = data_dir {
        config.data_dir = data_dir;
    }

    let registry = Registry::from_config(&config);
    let records = registry.load_active()?;
    let history = registry.load_changelog()?;

    if records.is_empty() && history.is_empty() {
        println!("❌ No registry found in {}", registry.data_dir().display());
        println!("💡 Run 'stock-registry update' first.");
        return Ok(());
    }

    println!("📊 Active universe: {} tickers", records.len());

    let mut by_tier: BTreeMap<CapTier, usize> = BTreeMap::new();
    for record in &records {
        *by_tier.entry(record.cap_tier).or_default() += 1;
    }
    for tier in CapTier::ALL {
        println!("   {:<10} {}", tier.label(), by_tier.get(&tier).copied().unwrap_or(0));
    }

    match history.first() {
        Some(latest) => {
            println!("📅 Last update: {} (+{} / -{})", latest.date, latest.added_count, latest.removed_count);
            if !latest.added.is_empty() {
                println!("   ➕ {}", latest.added.join(", "));
            }
            if !latest.removed.is_empty() {
                println!("   ➖ {}", latest.removed.join(", "));
            }
        }
        None => println!("📅 No changelog entries yet"),
    }

    Ok(())
}
