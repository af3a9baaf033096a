//! Service command handlers
//!
//! Handles listing and inspecting services and issuing lifecycle commands.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;
use warden_client::ControlPlaneClient;
use warden_monitor::{MonitorConfig, ServiceRegistry};
use warden_monitor::repository::{HttpServiceRepository, ServiceRepository};
use warden_monitor::scheduler::HealthPoller;
use warden_monitor::service::LifecycleController;

use crate::config::Config;
use crate::display::{print_outcome, print_service_details, print_service_line};

/// Service subcommands
#[derive(Subcommand)]
pub enum ServiceCommands {
    /// List all services
    List,
    /// Show one service
    Get {
        /// Service name
        name: String,
    },
    /// Start services (all services when none are named)
    Start {
        /// Service names
        names: Vec<String>,
    },
    /// Stop services (all services when none are named)
    Stop {
        /// Service names
        names: Vec<String>,

        /// Skip graceful shutdown
        #[arg(short, long)]
        force: bool,
    },
    /// Restart one service
    Restart {
        /// Service name
        name: String,
    },
}

/// Handle service commands
///
/// Routes service subcommands to their respective handlers.
///
/// # Arguments
/// * `command` - The service command to execute
/// * `config` - The CLI configuration
pub async fn handle_service_command(command: ServiceCommands, config: &Config) -> Result<()> {
    let monitor = config.monitor()?;
    let client = ControlPlaneClient::with_timeout(&monitor.base_url, monitor.request_timeout)
        .context("Failed to create control plane client")?;
    debug!("Using control plane at {}", client.base_url());

    match command {
        ServiceCommands::List => list_services(&client).await,
        ServiceCommands::Get { name } => {
            let (controller, _) = controller_with_poller(client, &monitor);
            get_service(&controller, &name).await
        }
        ServiceCommands::Start { names } => {
            let (controller, poller) = controller_with_poller(client, &monitor);
            let names: BTreeSet<String> = names.into_iter().collect();
            let outcome = controller.start(&names).await?;
            print_outcome(&outcome);
            print_current_state(&poller, &names);
            Ok(())
        }
        ServiceCommands::Stop { names, force } => {
            let (controller, poller) = controller_with_poller(client, &monitor);
            let names: BTreeSet<String> = names.into_iter().collect();
            let outcome = controller.stop(&names, force).await?;
            print_outcome(&outcome);
            print_current_state(&poller, &names);
            Ok(())
        }
        ServiceCommands::Restart { name } => {
            let (controller, poller) = controller_with_poller(client, &monitor);
            let outcome = controller.restart(&name).await?;
            print_outcome(&outcome);
            print_current_state(&poller, &BTreeSet::from([name]));
            Ok(())
        }
    }
}

/// List all services
async fn list_services(client: &ControlPlaneClient) -> Result<()> {
    let mut services = client.list_services().await?;
    services.sort_by(|a, b| a.name.cmp(&b.name));

    if services.is_empty() {
        println!("{}", "No services reported.".yellow());
    } else {
        println!("{}", format!("Found {} service(s):", services.len()).bold());
        println!();
        for service in &services {
            print_service_line(service);
        }
    }

    Ok(())
}

/// Show one service, or a notice when it does not exist
async fn get_service(controller: &LifecycleController, name: &str) -> Result<()> {
    match controller.get(name).await? {
        Some(service) => print_service_details(&service),
        None => println!("{}", format!("Service '{}' not found.", name).yellow()),
    }

    Ok(())
}

/// Print the refreshed state of the services a command touched
fn print_current_state(poller: &HealthPoller, names: &BTreeSet<String>) {
    let status = poller.status();
    if status.last_success.is_none() {
        if let Some(error) = status.last_error {
            println!("{} {}", "Could not refresh service state:".yellow(), error);
        }
        return;
    }

    let services = poller.registry().get_all();
    println!();
    for service in services
        .iter()
        .filter(|s| names.is_empty() || names.contains(&s.name))
    {
        print_service_line(service);
    }
}

/// Builds a one-shot controller whose refreshes land in a fresh registry
fn controller_with_poller(
    client: ControlPlaneClient,
    monitor: &MonitorConfig,
) -> (LifecycleController, Arc<HealthPoller>) {
    let repository: Arc<dyn ServiceRepository> = Arc::new(HttpServiceRepository::new(client));
    let poller = Arc::new(HealthPoller::new(
        Arc::clone(&repository),
        Arc::new(ServiceRegistry::new()),
        monitor.poll_interval,
        monitor.stale_after_failures,
    ));

    (LifecycleController::new(repository, Arc::clone(&poller)), poller)
}
