//! Readcast CLI
//!
//! Command-line interface for the Readcast PDF-to-audiobook backend.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "readcast")]
#[command(about = "Readcast PDF to audiobook CLI", long_about = None)]
struct Cli {
    /// Backend URL
    #[arg(
        long,
        env = "READCAST_API_URL",
        default_value = "http://localhost:8000"
    )]
    api_url: String,

    /// Bearer token for authenticated endpoints
    #[arg(long, env = "READCAST_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "readcast_client=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = Config {
        api_url: cli.api_url,
        token: cli.token,
    };

    handle_command(cli.command, &config).await
}
