//! Jobtap application shell.
//!
//! Parses the command line, loads configuration and dispatches to the
//! scrape, sync, export, seed and serve commands. Core logic lives in the
//! `crates/` directory.

pub mod cli;
pub mod commands;
pub mod error;
pub mod server;
pub mod sync;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command};
use jobtap_core::AppConfig;
use tracing::info;

/// Initialize tracing subscriber for logging
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,jobtap=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

/// Entry point for the `jobtap` binary.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    info!("Starting Jobtap v{}", env!("CARGO_PKG_VERSION"));

    let config =
        AppConfig::load_with_env(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Command::Query { query, output } => commands::query(&config, &query, output.as_deref()).await,
        Command::Sync { queries, output } => {
            commands::sync(&config, queries.as_deref(), output.as_deref()).await
        }
        Command::Export { output } => commands::export(&config, &output).await,
        Command::Seed { input } => commands::seed(&config, &input).await,
        Command::Serve => commands::serve(&config).await,
    }
}
