mod cli;
mod commands;
mod logging;

use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

use transcriptor::config::{load_config, load_default_config};
use transcriptor::TranscriptionService;

use crate::cli::{Args, Commands};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = logging::init_logging(args.json_logs) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => load_default_config().context("Failed to load default config")?,
    };
    let service = TranscriptionService::new(config);

    match args.command {
        Commands::Run { archive } => commands::run_archive(&service, &archive).await,
        Commands::Submit { archives, poll_ms } => {
            commands::submit_archives(&service, &archives, Duration::from_millis(poll_ms.max(1)))
                .await
        }
        Commands::History { limit } => commands::print_history(&service, limit).await,
        Commands::Config => commands::print_config(&service),
    }
}
