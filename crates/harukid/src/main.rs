//! harukid - The haruki background service

use anyhow::{Context, Result};
use clap::Parser;
use harukid::Service;
use haruki_config::load_config;
use haruki_util::default_config_path;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// harukid - Media request wizards for chat bridges
#[derive(Parser, Debug)]
#[command(name = "harukid")]
#[command(about = "Media request and remediation wizards for chat bridges", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/haruki/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set HARUKI_SOCKET env var)
    #[arg(short, long, env = "HARUKI_SOCKET")]
    socket: Option<PathBuf>,

    /// Log level, overrides the config file
    #[arg(short, long, env = "HARUKI_LOG")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let settings = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| settings.service.log_level.clone());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config_path = %args.config.display(),
        "harukid starting"
    );

    let service = Service::new(settings, args.socket).await?;
    service.run().await
}
