//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod health;
mod logs;
mod services;
mod watch;

pub use services::ServiceCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Service inspection and lifecycle
    Services {
        #[command(subcommand)]
        command: ServiceCommands,
    },
    /// Show the fleet health snapshot
    Health {
        /// Print the raw snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Follow the live log stream
    Logs,
    /// Watch fleet state and the log stream until interrupted
    Watch,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Services { command } => services::handle_service_command(command, config).await,
        Commands::Health { json } => health::show_health(config, json).await,
        Commands::Logs => logs::follow_logs(config).await,
        Commands::Watch => watch::watch(config).await,
    }
}
