//! Top-level CLI configuration.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::commands::Command;

/// Chord-style DHT node for the peer-to-peer backup system.
#[derive(Debug, Parser)]
#[command(name = "chord-node", version, about)]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    pub async fn run(self) -> anyhow::Result<()> {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();
        self.command.run().await
    }
}
