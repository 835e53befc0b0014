pub mod cli;
pub mod config;
pub mod engine;
pub mod model;
pub mod remote;
pub mod whitelist;
pub mod worlds;

use anyhow::Result;
use clap::Parser;

/// Library entrypoint; parses the CLI and dispatches.
pub async fn run() -> Result<()> {
    cli::run(cli::Cli::parse()).await
}
