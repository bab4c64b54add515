use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use spimex_loader::collector::BulletinCollector;
use spimex_loader::crawler::ListingCrawler;
use spimex_loader::database::Database;
use spimex_loader::fetcher::BulletinFetcher;
use spimex_loader::models::{Config, DateOutcome};

#[derive(Parser)]
#[command(name = "spimex-loader", about = "SPIMEX oil-products bulletin loader")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl the listing and load every bulletin dated at or after the cutoff
    Sync {
        /// Lower date bound (defaults to MIN_DATE from the environment)
        #[arg(long)]
        min_date: Option<NaiveDate>,
        /// Stop after this many listing pages
        #[arg(long)]
        max_pages: Option<u32>,
    },
    /// Load only the most recent bulletin from the first listing page
    Latest,
    /// Drop and recreate the results table
    ResetDb,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "spimex_loader=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let database = match Database::connect(&config.database_path).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            eprintln!("Database error: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Sync { min_date, max_pages } => {
            std::fs::create_dir_all(&config.data_dir)?;
            let min_date = min_date.unwrap_or(config.min_date);
            let collector = build_collector(&config, database)?;

            let report = collector.run_sync(min_date, max_pages).await?;
            println!(
                "Loaded {} dates ({} records), skipped {}",
                report.dates_loaded, report.records_inserted, report.dates_skipped
            );
        }
        Commands::Latest => {
            std::fs::create_dir_all(&config.data_dir)?;
            let collector = build_collector(&config, database)?;

            match collector.run_latest().await {
                Some(DateOutcome::Loaded(count)) => println!("Loaded {} records", count),
                Some(DateOutcome::Skipped(reason)) => println!("Skipped: {}", reason),
                None => {
                    eprintln!("No bulletin link found on the listing");
                    std::process::exit(1);
                }
            }
        }
        Commands::ResetDb => {
            database.drop_table().await?;
            database.create_table().await?;
            println!("Results table recreated");
        }
    }

    Ok(())
}

fn build_collector(config: &Config, database: Database) -> Result<BulletinCollector> {
    let crawler = ListingCrawler::new(config)?;
    let fetcher = BulletinFetcher::new(config)?;
    Ok(BulletinCollector::new(crawler, fetcher, database))
}
