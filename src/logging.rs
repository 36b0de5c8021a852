//! Logging setup. Stdout belongs to the conversation, so logs go to a file.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::config_dir;

/// Installs the global subscriber. `RUST_LOG` wins over `verbose`.
/// Returns the log file path, or `None` when the file cannot be opened.
pub fn init_logging(verbose: bool) -> Option<PathBuf> {
    let default_filter = if verbose { "bono=debug" } else { "bono=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let log_dir = log_dir();
    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Could not create log directory: {e}");
        return None;
    }

    let log_file = log_dir.join("bono.log");
    let file = match OpenOptions::new().create(true).append(true).open(&log_file) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not open log file: {e}");
            return None;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();

    Some(log_file)
}

pub fn log_dir() -> PathBuf {
    config_dir()
        .map(|dir| dir.join("logs"))
        .unwrap_or_else(|_| PathBuf::from(".bono/logs"))
}
