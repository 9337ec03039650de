//! shopfront command line entry point.
//!
//! Wires storage, cache, network tracking and the shop services once, runs a
//! single command, and prints its result as JSON on stdout. Logs go to stderr.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use shopfront_core::AppConfig;
use tracing_subscriber::EnvFilter;

mod app;
mod commands;
mod error;

#[derive(Parser, Debug)]
#[command(name = "shopfront")]
#[command(about = "Headless client for the shop backend")]
#[command(version)]
struct Cli {
    /// TOML config file (default: $SHOPFRONT_CONFIG_FILE)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => AppConfig::load_from(Some(path))?,
        None => AppConfig::load()?,
    };
    tracing::info!(environment = ?config.environment, base_url = config.base_url(), "starting shopfront");

    let app = app::App::bootstrap(config).await?;
    let output = commands::run(&app, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
