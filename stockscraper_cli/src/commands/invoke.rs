use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;
use stockscraper_lib::store::BlobStore;
use stockscraper_lib::{InvocationResponse, Orchestrator};

#[derive(Args)]
pub struct InvokeArgs {
    /// Path to a JSON event file; reads stdin when omitted or "-"
    #[arg(long)]
    pub event: Option<PathBuf>,
}

pub async fn run<S: BlobStore>(
    args: &InvokeArgs,
    orchestrator: &Orchestrator<S>,
) -> Result<InvocationResponse> {
    let raw = read_event(args.event.as_ref())?;
    let event: Value = serde_json::from_str(&raw).context("event is not valid JSON")?;
    Ok(orchestrator.handle(&event).await)
}

fn read_event(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(p) if p.as_os_str() != "-" => std::fs::read_to_string(p)
            .with_context(|| format!("failed to read event file {}", p.display())),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read event from stdin")?;
            Ok(buf)
        }
    }
}
