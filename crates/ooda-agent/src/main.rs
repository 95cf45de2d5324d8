//! OODA trading agent - Entry Point

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Autonomous OODA trading agent
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via OODA_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Trade against the in-memory paper platform
    #[arg(long)]
    paper: bool,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    ooda_telemetry::init_logging(ooda_telemetry::DEFAULT_LOG_FILTER)?;

    info!("Starting OODA agent v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > OODA_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("OODA_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");
    let config = ooda_agent::AppConfig::from_file(&config_path)?;
    config.validate()?;
    info!(
        watchlist = config.agent.watchlist.len(),
        interval_ms = config.agent.cycle_interval_ms,
        "Configuration loaded"
    );

    if args.check {
        info!("Configuration OK");
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Shutdown signal received");
            signal.cancel();
        }
    });

    let mut app = ooda_agent::Application::new(config)?;
    if args.paper {
        app = app.with_paper();
    }
    app.run(shutdown).await?;

    Ok(())
}
