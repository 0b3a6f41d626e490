//! Binary crate for the `rainwatch` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive configuration
//! - Serving the feed and the update trigger over HTTP

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rainwatch=info,rainwatch_core=info".into()),
        )
        .init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
