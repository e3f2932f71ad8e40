use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cabong_agenda::sheets::SheetCache;
use cabong_agenda::{server, AppConfig, Pipeline};

#[derive(Parser)]
#[command(name = "cabong-agenda", version, about = "El Cabong agenda sheet pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the events, revalidate and sync endpoints
    Serve,
    /// Run one scrape-merge-write cycle and print the report
    Sync,
    /// Print the listing sheet as JSON
    Events,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;
    if config.sheet_id.is_empty() {
        tracing::warn!("no sheet id configured; set SHEET_ID or sheet_id in the config file");
    }

    let cache = Arc::new(SheetCache::new(config.poll_interval()));
    let pipeline = Pipeline::from_config(config, cache).context("unable to build pipeline")?;

    match cli.command {
        Command::Serve => server::serve(Arc::new(pipeline)).await,
        Command::Sync => {
            let report = pipeline.sync().await.context("sync cycle failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Events => {
            let events = pipeline.listing().await;
            println!("{}", serde_json::to_string_pretty(&events)?);
            Ok(())
        }
    }
}
