//! Warden CLI
//!
//! Command-line interface for supervising a service fleet through its
//! control plane.

mod commands;
mod config;
mod display;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Warden service fleet CLI", long_about = None)]
struct Cli {
    /// Control plane URL
    #[arg(long, global = true, env = "WARDEN_URL", default_value = "http://localhost:8000")]
    url: String,

    /// Live log stream URL (defaults to the control plane's /api/logs)
    #[arg(long, global = true, env = "WARDEN_STREAM_URL")]
    stream_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        base_url: cli.url,
        stream_url: cli.stream_url,
    };

    handle_command(cli.command, &config).await
}
