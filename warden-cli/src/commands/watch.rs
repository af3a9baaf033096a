//! Watch command handler
//!
//! Runs a full monitoring session and prints the fleet summary after every
//! applied snapshot and every log stream state change.

use anyhow::{Context, Result};
use colored::*;
use warden_monitor::MonitorSession;

use crate::config::Config;
use crate::display::{colorize_connection, print_summary};

/// Watch the fleet until Ctrl-C
pub async fn watch(config: &Config) -> Result<()> {
    let monitor = config.monitor()?;
    let mut session = MonitorSession::start(&monitor).context("Failed to start session")?;
    let mut registry = session.registry().subscribe();
    let mut stream = session.stream().subscribe();
    let mut poller = session.poller().subscribe();

    println!(
        "{} {} {}",
        "Watching".bold(),
        monitor.base_url,
        "(Ctrl-C to stop)".dimmed()
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = registry.changed() => {
                if changed.is_err() {
                    break;
                }
                registry.borrow_and_update();
                print_status_line(&session);
            }
            changed = stream.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = stream.borrow_and_update().clone();
                if status.state.is_failed() {
                    println!(
                        "{} {}",
                        "Log stream failed:".red(),
                        status.last_error.as_deref().unwrap_or("unknown error")
                    );
                }
                print_status_line(&session);
            }
            changed = poller.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = poller.borrow_and_update().clone();
                if status.stale {
                    println!(
                        "{} {}",
                        "Fleet state is stale:".yellow(),
                        status.last_error.unwrap_or_default()
                    );
                }
            }
        }
    }

    session.shutdown().await;
    Ok(())
}

fn print_status_line(session: &MonitorSession) {
    let snapshot = session.registry().snapshot();
    let updated = snapshot
        .updated_at
        .map(|at| at.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string());

    print!(
        "{} [{}] ",
        updated.dimmed(),
        colorize_connection(session.stream().state())
    );
    print_summary(&session.summary());

    for (service, dependency) in session.registry().unresolved_dependencies() {
        println!(
            "  {} {} depends on unknown service {}",
            "!".yellow(),
            service,
            dependency
        );
    }
}
