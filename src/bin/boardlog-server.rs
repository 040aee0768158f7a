// HTTP server exposing the log console

use anyhow::{Context, Result};
use boardlog::config::BoardlogConfig;
use boardlog::logs::LogPipeline;
use boardlog::{server, telemetry};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Serve GET /api/logs/ over the backend's rotating log file
#[derive(Parser)]
#[command(name = "boardlog-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file (.toml or .json); defaults plus BOARDLOG_ADMIN_TOKEN when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = BoardlogConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?;

    // The pipeline lives as long as the process and is handed to the subscriber explicitly
    let pipeline = Arc::new(
        LogPipeline::new(config.pipeline_settings()?)
            .with_context(|| format!("Failed to open log file {}", config.logs.file.display()))?,
    );
    telemetry::init(&config, Arc::clone(&pipeline)).context("Failed to initialize logging")?;

    info!("Starting boardlog server v{}", env!("CARGO_PKG_VERSION"));
    info!("Serving log file: {}", config.logs.file.display());

    server::serve(&config).await.context("Server error")?;

    pipeline.flush().context("Failed to flush log file")?;
    Ok(())
}
