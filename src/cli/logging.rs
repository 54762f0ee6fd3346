//! Logging initialization

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset and debug logging is off
const DEFAULT_FILTER: &str = "warn,kube_checker=info";

/// Initialize logging based on debug flag
/// Returns the log file path if debug logging is enabled
pub fn init_logging(debug: bool) -> Result<Option<PathBuf>> {
    if !debug {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
            )
            .with_target(false)
            .init();
        return Ok(None);
    }

    // Logs go to a file so the interactive view keeps the terminal to itself
    let (file, path) = tempfile::Builder::new()
        .prefix("kube-checker-")
        .suffix(".log")
        .tempfile()
        .context("Failed to create log file")?
        .keep()
        .context("Failed to persist log file")?;

    tracing_subscriber::fmt()
        .with_writer(file)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    Ok(Some(path))
}
