//! Health command handler

use anyhow::{Context, Result};
use colored::*;
use warden_client::ControlPlaneClient;
use warden_monitor::StatusSummary;

use crate::config::Config;
use crate::display::{print_service_line, print_summary};

/// Print the health snapshot and the aggregated summary
pub async fn show_health(config: &Config, json: bool) -> Result<()> {
    let monitor = config.monitor()?;
    let client = ControlPlaneClient::with_timeout(&monitor.base_url, monitor.request_timeout)
        .context("Failed to create control plane client")?;
    let snapshot = client.health().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let overall = if snapshot.all_healthy {
        snapshot.status.green()
    } else {
        snapshot.status.yellow()
    };
    println!("{} {}", "Fleet status:".bold(), overall);
    println!();

    let services = snapshot.to_services();
    if services.is_empty() {
        println!("{}", "No services reported.".yellow());
    }
    for service in &services {
        print_service_line(service);
    }

    println!();
    print_summary(&StatusSummary::from_services(&services));

    Ok(())
}
