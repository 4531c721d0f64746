//! atam CLI - initialize the store, run the harvester, render reports.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use atam::application::{HarvestConfig, Harvester};
use atam::domain::{DistrictDirectory, KeyRing, month_range};
use atam::infrastructure::{
    ApiClient, ApiClientConfig, AppConfig, ConfigManager, FileProgressStore, MolitTradeFetcher,
    SqliteTradeRepository, erd, init_logging, report,
};

#[derive(Parser, Debug)]
#[command(
    name = "atam",
    version,
    about = "Apartment trade harvester for the MOLIT open API"
)]
struct Cli {
    /// Configuration file path.
    #[arg(long, short = 'c', global = true, default_value = "config/atam.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database schema and import the district reference CSV.
    Init,
    /// Harvest trades from the persisted cursor onward.
    Crawl,
    /// Summarize the harvested store as markdown.
    Report {
        /// Write to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Emit the store schema as Graphviz DOT.
    Erd {
        /// Output path for the DOT source.
        #[arg(long, default_value = "docs/erd/schema.dot")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let manager = ConfigManager::new(&cli.config);
    let config = manager.load().await?;
    init_logging(&config.logging)?;

    match cli.command {
        Command::Init => cmd_init(&config).await,
        Command::Crawl => cmd_crawl(&config).await,
        Command::Report { out } => cmd_report(&config, out.as_deref()).await,
        Command::Erd { out } => erd::write_diagram(&out),
    }
}

async fn cmd_init(config: &AppConfig) -> Result<()> {
    let repo = SqliteTradeRepository::connect(&config.database.url).await?;
    repo.init_schema().await?;
    let imported = repo
        .import_districts(&config.database.district_csv)
        .await?;
    info!(imported, "✅ Initialization complete");
    Ok(())
}

async fn cmd_crawl(config: &AppConfig) -> Result<()> {
    config.validate().context("configuration invalid")?;

    let repo = SqliteTradeRepository::connect(&config.database.url).await?;
    repo.init_schema().await?;
    let districts = repo.load_districts().await?;
    anyhow::ensure!(
        !districts.is_empty(),
        "district reference table is empty; run `atam init` first"
    );

    let directory = Arc::new(DistrictDirectory::new(districts.clone()));
    let buckets = month_range(config.crawl.start_year, config.crawl.end_year);
    let keys = KeyRing::new(
        config.api.service_keys.clone(),
        config.api.daily_call_cap,
        chrono::Local::now().date_naive(),
    )?;

    let api_client = ApiClient::new(ApiClientConfig {
        endpoint: config.api.endpoint.clone(),
        timeout_seconds: config.api.timeout_seconds,
        max_requests_per_second: requests_per_second(config.crawl.request_delay_ms),
        ..ApiClientConfig::default()
    })?;
    let fetcher = MolitTradeFetcher::new(api_client, Arc::clone(&directory));
    let progress = FileProgressStore::new(&config.crawl.progress_path);

    let mut harvester = Harvester::new(
        fetcher,
        repo,
        progress,
        keys,
        districts,
        buckets,
        HarvestConfig {
            page_size: config.api.page_size,
            request_delay_ms: config.crawl.request_delay_ms,
        },
    );

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("🛑 Shutdown requested; finishing the in-flight unit");
                signal_token.cancel();
            }
            Err(e) => warn!(error = %e, "Failed to listen for shutdown signal"),
        }
    });

    let summary = harvester.run(token).await?;
    if summary.cancelled {
        warn!("Harvest stopped early; run `atam crawl` again to resume");
    }
    Ok(())
}

async fn cmd_report(config: &AppConfig, out: Option<&Path>) -> Result<()> {
    let repo = SqliteTradeRepository::connect(&config.database.url).await?;
    repo.init_schema().await?;
    let rendered = report::summary_report(&repo).await?;

    match out {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating report directory {parent:?}"))?;
            }
            std::fs::write(path, &rendered)
                .with_context(|| format!("writing report {path:?}"))?;
            info!(path = ?path, "Wrote summary report");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn requests_per_second(delay_ms: u64) -> u32 {
    (1_000 / delay_ms.max(1)).max(1) as u32
}
