//! Terminal rendering shared by the command handlers

use colored::*;
use warden_core::domain::command::{CommandOutcome, CommandStatus, is_error_detail};
use warden_core::domain::log::{LogEntry, LogLevel};
use warden_core::domain::service::{Service, ServiceState};
use warden_core::domain::stream::ConnectionState;
use warden_monitor::StatusSummary;

/// Print a one-line service summary
pub fn print_service_line(service: &Service) {
    let uptime = service
        .uptime()
        .map(|d| format_uptime(d.as_secs()))
        .unwrap_or_else(|| "-".to_string());

    println!(
        "  {} {:<20} {:<10} {}",
        "▸".cyan(),
        service.name.bold(),
        colorize_state(service.state()),
        uptime.dimmed()
    );
}

/// Print full service details
pub fn print_service_details(service: &Service) {
    println!("{} {}", "Service".bold(), service.name.bold());
    println!("  State:        {}", colorize_state(service.state()));
    println!("  Status:       {}", service.status);
    println!(
        "  Uptime:       {}",
        service
            .uptime()
            .map(|d| format_uptime(d.as_secs()))
            .unwrap_or_else(|| "-".to_string())
    );
    if !service.depends_on.is_empty() {
        let deps: Vec<&str> = service.depends_on.iter().map(String::as_str).collect();
        println!("  Depends on:   {}", deps.join(", "));
    }
    if let Some(error) = &service.last_error {
        println!("  Last error:   {}", error.red());
    }
}

pub fn print_summary(summary: &StatusSummary) {
    println!(
        "{} total, {} running, {} stopped, {} warning",
        summary.total.to_string().bold(),
        summary.running.to_string().green(),
        summary.stopped.to_string().red(),
        summary.warning.to_string().yellow()
    );
}

/// Print a command outcome with one line per service
pub fn print_outcome(outcome: &CommandOutcome) {
    let status = match outcome.status {
        CommandStatus::Success => "success".green(),
        CommandStatus::Partial => "partial".yellow(),
        CommandStatus::Failure => "failure".red(),
    };

    if outcome.message.is_empty() {
        println!("{}", status.bold());
    } else {
        println!("{}: {}", status.bold(), outcome.message);
    }

    for (name, detail) in &outcome.details {
        let detail = if is_error_detail(detail) {
            detail.red()
        } else {
            detail.normal()
        };
        println!("  {} {}: {}", "▸".cyan(), name.bold(), detail);
    }
}

pub fn print_log_entry(entry: &LogEntry) {
    let level = entry.level.to_string();
    let level = match entry.level {
        LogLevel::Info => level.cyan(),
        LogLevel::Warning => level.yellow(),
        LogLevel::Error => level.red(),
    };

    println!(
        "{} [{}] {}",
        entry.timestamp.format("%H:%M:%S").to_string().dimmed(),
        level,
        entry.message
    );
}

pub fn colorize_state(state: ServiceState) -> ColoredString {
    let label = state.to_string();
    match state {
        ServiceState::Healthy => label.green(),
        ServiceState::Warning => label.yellow(),
        ServiceState::Stopped => label.red(),
    }
}

pub fn colorize_connection(state: ConnectionState) -> ColoredString {
    let label = state.to_string();
    match state {
        ConnectionState::Connected => label.green(),
        ConnectionState::Connecting | ConnectionState::Reconnecting => label.yellow(),
        ConnectionState::Disconnected => label.dimmed(),
        ConnectionState::Failed => label.red(),
    }
}

/// Formats seconds as e.g. `2d 3h`, `4h 12m`, `5m 7s`
pub fn format_uptime(secs: u64) -> String {
    let (days, hours, minutes, seconds) =
        (secs / 86_400, secs % 86_400 / 3_600, secs % 3_600 / 60, secs % 60);

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
