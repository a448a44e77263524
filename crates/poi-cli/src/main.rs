use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use poi_storage::PgDatastore;
use poi_sync::{render, RunMode, SyncConfig, SyncPipeline, MEMORY_DATABASE_SCHEME};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "poi-cli")]
#[command(about = "Ingest points of interest into the moderation queue")]
struct Cli {
    /// Load into a throwaway in-memory store instead of DATABASE_URL.
    #[arg(long, global = true)]
    dry_run: bool,
    /// Overrides SNAPSHOT_DIR.
    #[arg(long, global = true)]
    snapshot_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch every category, snapshot it and load it.
    IngestAndLoad,
    /// Load the snapshots already on disk.
    LoadExisting,
    /// Purge pending records, then ingest and load.
    FreshIngest,
    /// Apply database migrations and exit.
    Migrate,
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    init_tracing()?;
    let cli = Cli::parse();

    let mut config = SyncConfig::from_env()?;
    if cli.dry_run {
        config.database_url = MEMORY_DATABASE_SCHEME.to_string();
    }
    if let Some(dir) = cli.snapshot_dir {
        config.snapshot_dir = dir;
    }

    let mode = match cli.command {
        Commands::IngestAndLoad => RunMode::IngestAndLoad,
        Commands::LoadExisting => RunMode::LoadExisting,
        Commands::FreshIngest => RunMode::FreshIngest,
        Commands::Migrate => {
            PgDatastore::connect(&config.database_url)
                .await
                .context("applying migrations")?;
            info!("migrations applied");
            return Ok(ExitCode::SUCCESS);
        }
    };

    let pipeline = SyncPipeline::from_config(&config).await?;
    let report = pipeline.run(mode).await?;
    println!("{}", render(&report));

    if report.all_failed() {
        eprintln!("every category failed");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
