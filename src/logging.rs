//! File logging. The terminal owns stdout, so every record goes to a file.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::error::StorageError;

/// Directive used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Installs the global subscriber writing to `log_file_path`.
pub fn init_global(log_file_path: &Path) -> Result<(), StorageError> {
    if let Some(parent) = log_file_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let log_file = File::create(log_file_path)?;
    build_subscriber(log_file, env_filter()).init();
    Ok(())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

pub fn build_subscriber(
    log_file: File,
    filter: EnvFilter,
) -> impl tracing::Subscriber + Send + Sync {
    let fmt_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry().with(fmt_layer).with(filter)
}
