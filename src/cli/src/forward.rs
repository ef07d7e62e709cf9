use std::path::Path;

use anyhow::{Context, Result};
use linemux::MuxedLines;
use tokio_stream::StreamExt;
use tracing::{info, warn};

use hivewire_client::config_manager::Config;
use hivewire_client::EventForwarder;
use hivewire_common::event::EventRecord;

/// Standalone deployment mode: tail the honeypot's JSON log and write each
/// record to the forwarder until the process is interrupted.
#[tokio::main]
pub async fn run(config: Config, log_file: &Path) -> Result<()> {
    let mut lines = MuxedLines::new().context("failed to initialize log tailer")?;
    lines
        .add_file(log_file)
        .await
        .with_context(|| format!("cannot tail {}", log_file.display()))?;

    info!("tailing {}", log_file.display());
    let forwarder = EventForwarder::start(config);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
            line = lines.try_next() => match line? {
                Some(line) => dispatch_line(&forwarder, line.line()),
                None => break,
            }
        }
    }

    forwarder.stop().await;
    Ok(())
}

fn dispatch_line(forwarder: &EventForwarder, line: &str) {
    if line.trim().is_empty() {
        return;
    }
    match serde_json::from_str::<EventRecord>(line) {
        Ok(event) => forwarder.write(&event),
        Err(e) => warn!("skipping malformed log line: {e}"),
    }
}
