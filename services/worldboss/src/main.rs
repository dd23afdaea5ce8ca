//! Worldboss CLI
//!
//! Command-line interface for the world boss schedule watcher.

use std::path::PathBuf;

use clap::Parser;
use tracing::Level;
use worldboss::{load_config, Config, WorldbossBuilder};

#[derive(Parser)]
#[command(name = "worldboss")]
#[command(about = "World boss schedule watcher with alerts and expedition automation")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dashboard port (overrides config file)
    #[arg(long)]
    dashboard_port: Option<u16>,

    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, dashboard_port={:?}, log_level={:?}",
        args.config,
        args.dashboard_port,
        args.log_level
    );

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    config.resolve_env();

    if let Some(dashboard_port) = args.dashboard_port {
        config.dashboard.port = dashboard_port;
    }

    tracing::info!("Starting worldboss service");
    tracing::debug!(
        "Schedule: {}, poll interval: {}s, dashboard enabled: {}",
        config.site.world_bosses_url(),
        config.poller.interval_seconds,
        config.dashboard.enabled
    );

    WorldbossBuilder::new(config).build().await?.start().await?;

    Ok(())
}
