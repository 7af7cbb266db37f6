//! NewsTrader - Main Entry Point
//!
//! Keeps the economic calendar in sync and announces trade directions for
//! configured events as soon as they are released.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use news_trader::config::load_config;
use news_trader::service::{self, NewsService, Stores};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error); overrides settings.log_level
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sync hourly and trade scheduled releases until interrupted (default)
    Run,
    /// Run one full calendar sync
    Sync {
        /// First day of the window (YYYY-MM-DD)
        #[arg(long, requires = "end")]
        start: Option<NaiveDate>,
        /// Last day of the window (YYYY-MM-DD)
        #[arg(long, requires = "start")]
        end: Option<NaiveDate>,
    },
    /// Run one matcher pass and wait for the scheduled jobs
    Match {
        /// Also trade today's already released events
        #[arg(long)]
        send_previous: bool,
    },
    /// Seed trade conditions from a JSON array
    ImportConditions {
        path: PathBuf,
    },
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let config = load_config(Some(&args.config)).context("loading configuration")?;

    // Initialize logging
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(config.settings.log_level.as_str());
    let level = parse_level(level);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting NewsTrader");
    info!("Configuration file: {}", args.config);

    match args.command.unwrap_or(Command::Run) {
        Command::Run => {
            let service = NewsService::from_config(&config).await?;
            service.run().await?;
        }
        Command::Sync { start, end } => {
            let range = start.zip(end);
            let report = service::sync_once(&config, range).await?;
            info!(
                "Sync finished: {} events, {} timelines",
                report.events, report.timelines
            );
        }
        Command::Match { send_previous } => {
            let service = NewsService::from_config(&config).await?;
            let report = service.match_once(send_previous).await?;
            info!("Matcher finished: {:?}", report);

            if !service.scheduler().pending().await.is_empty() {
                info!("Waiting for scheduled jobs, Ctrl-C to stop");
                tokio::signal::ctrl_c().await?;
                service.scheduler().shutdown().await;
            }
        }
        Command::ImportConditions { path } => {
            let stores = Stores::open(&config).await?;
            let count = service::import_conditions(&stores, &path).await?;
            info!("Imported {} trade conditions", count);
        }
    }

    Ok(())
}
