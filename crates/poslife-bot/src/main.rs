//! poslife - Entry Point
//!
//! Feeds a JSON-lines command stream (file or stdin) to the position
//! lifecycle engine.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio::io::BufReader;
use tracing::info;

/// Position lifecycle engine
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via POSLIFE_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// JSON-lines command file (reads stdin when omitted)
    #[arg(short, long)]
    events: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    poslife_telemetry::init_logging()?;

    info!("Starting poslife v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > POSLIFE_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("POSLIFE_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");
    let config = poslife_bot::AppConfig::from_file(&config_path)?;
    info!(
        amount_tolerance = %config.engine.amount_tolerance,
        order_ids = ?config.orders.kind,
        "Configuration loaded"
    );

    let app = poslife_bot::Application::new(config)?;

    let summary = match args.events {
        Some(path) => {
            info!(path = %path.display(), "Reading commands from file");
            let file = tokio::fs::File::open(&path).await?;
            app.run(BufReader::new(file)).await?
        }
        None => {
            info!("Reading commands from stdin");
            app.run(BufReader::new(tokio::io::stdin())).await?
        }
    };

    info!(
        commands = summary.commands,
        rejected = summary.rejected,
        "Done"
    );
    Ok(())
}
