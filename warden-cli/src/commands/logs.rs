//! Logs command handler
//!
//! Follows the live log stream until Ctrl-C, a normal close by the server,
//! or reconnect exhaustion.

use anyhow::Result;
use colored::*;
use std::sync::Arc;
use tokio::time::{self, Duration};
use tracing::debug;
use warden_core::domain::stream::ConnectionState;
use warden_monitor::service::LogBufferReader;
use warden_monitor::stream::{LogStream, StreamConfig, WsTransport};

use crate::config::Config;
use crate::display::{colorize_connection, print_log_entry};

/// Follow the live log stream
pub async fn follow_logs(config: &Config) -> Result<()> {
    let monitor = config.monitor()?;
    let transport = Arc::new(WsTransport::new(&monitor.stream_url));
    let mut stream = LogStream::spawn(transport, StreamConfig::from(&monitor));
    let mut status = stream.subscribe();
    let mut printer = LogPrinter::new(stream.buffer());
    let mut ticker = time::interval(Duration::from_millis(200));
    let mut was_connected = false;

    println!("{} {}", "Following".bold(), monitor.stream_url);
    stream.open();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let result = loop {
        tokio::select! {
            _ = &mut ctrl_c => break Ok(()),
            _ = ticker.tick() => printer.print_new(),
            changed = status.changed() => {
                if changed.is_err() {
                    break Ok(());
                }

                let current = status.borrow_and_update().clone();
                debug!("Log stream status: {:?}", current);
                eprintln!("{} {}", "stream:".dimmed(), colorize_connection(current.state));

                match current.state {
                    ConnectionState::Connected => was_connected = true,
                    ConnectionState::Disconnected if was_connected => break Ok(()),
                    ConnectionState::Failed => {
                        printer.print_new();
                        break Err(anyhow::anyhow!(
                            "log stream failed: {}",
                            current.last_error.unwrap_or_else(|| "unknown error".to_string())
                        ));
                    }
                    _ => {}
                }
            }
        }
    };

    stream.close().await;
    printer.print_new();
    result
}

/// Prints entries that arrived since the last call
struct LogPrinter {
    buffer: LogBufferReader,
    seen: u64,
}

impl LogPrinter {
    fn new(buffer: LogBufferReader) -> Self {
        Self { buffer, seen: 0 }
    }

    fn print_new(&mut self) {
        let (seen, fresh) = self.buffer.entries_since(self.seen);
        let missed = (seen - self.seen).saturating_sub(fresh.len() as u64);
        if missed > 0 {
            debug!("{} log entries evicted before they were printed", missed);
        }
        for entry in &fresh {
            print_log_entry(entry);
        }
        self.seen = seen;
    }
}
