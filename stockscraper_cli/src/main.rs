mod commands;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stockscraper_lib::store::BlobStore;
use stockscraper_lib::{FsBlobStore, InvocationResponse, MemoryBlobStore, Orchestrator, ScraperConfig};

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "stockscraper")]
#[command(about = "Scrape stock quotes and publish them to a blob store")]
struct Cli {
    /// Output format: raw or json
    #[arg(long, default_value = "json", global = true)]
    output: String,

    /// Directory backing the local blob store
    #[arg(long, default_value = "./blob-store", global = true)]
    store_dir: PathBuf,

    /// Keep published objects in memory instead of on disk
    #[arg(long, global = true)]
    memory_store: bool,

    /// Seconds allowed for acquiring all quotes before falling back
    #[arg(long, global = true)]
    deadline_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle a raw invocation event (`{"body": ...}` or a bare request)
    Invoke(commands::invoke::InvokeArgs),
    /// Scrape the given identifiers
    Scrape(commands::scrape::ScrapeArgs),
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("stockscraper=info".parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let format = match cli.output.as_str() {
        "raw" => OutputFormat::Raw,
        _ => OutputFormat::Json,
    };

    let mut config = ScraperConfig::from_env();
    if let Some(secs) = cli.deadline_secs {
        config.deadline = Some(Duration::from_secs(secs));
    }

    let resp = if cli.memory_store {
        let orchestrator = Orchestrator::new(config, MemoryBlobStore::new())
            .context("failed to build HTTP client")?;
        dispatch(&cli.command, &orchestrator).await?
    } else {
        let orchestrator = Orchestrator::new(config, FsBlobStore::new(&cli.store_dir))
            .context("failed to build HTTP client")?;
        dispatch(&cli.command, &orchestrator).await?
    };

    output::print_response(&resp, format)?;

    if resp.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

async fn dispatch<S: BlobStore>(
    command: &Commands,
    orchestrator: &Orchestrator<S>,
) -> Result<InvocationResponse> {
    match command {
        Commands::Invoke(args) => commands::invoke::run(args, orchestrator).await,
        Commands::Scrape(args) => commands::scrape::run(args, orchestrator).await,
    }
}
