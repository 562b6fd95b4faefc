//! Structured logging.
//!
//! # Responsibilities
//! - Install the global `tracing` subscriber
//! - Route output to stdout or, with `-l`, to an append-mode file
//! - Apply `advanced.log_level` after each preference load
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the preference file; when it is set the level is
//!   never touched again
//! - The filter sits behind a reload layer so a `/readconf` can change the
//!   level without reinstalling the subscriber

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use tracing_subscriber::{
    fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

const CRATE_TARGET: &str = "subconverter";

static FILTER: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to open log file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

pub fn init(log_file: Option<&Path>) -> Result<(), LoggingError> {
    let from_env = std::env::var_os(EnvFilter::DEFAULT_ENV).is_some();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directive_for("info")));
    let (filter, handle) = reload::Layer::new(filter);

    let file = log_file
        .map(|path| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| LoggingError::Open {
                    path: path.to_path_buf(),
                    source,
                })
        })
        .transpose()?;

    let (file_layer, stdout_layer) = match file {
        Some(file) => (
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file))),
            None,
        ),
        None => (None, Some(fmt::layer())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()?;

    if !from_env {
        let _ = FILTER.set(handle);
    }
    Ok(())
}

/// Switch the crate's level. A no-op before `init` or when `RUST_LOG` is set.
pub fn apply_level(level: &str) {
    let Some(handle) = FILTER.get() else {
        return;
    };
    match EnvFilter::try_new(directive_for(level)) {
        Ok(filter) => {
            if let Err(e) = handle.reload(filter) {
                tracing::warn!(error = %e, "Failed to apply log level");
            }
        }
        Err(e) => tracing::warn!(level, error = %e, "Ignoring invalid log level"),
    }
}

/// Preference level names, including the legacy `verbose` and `fatal`.
fn directive_for(level: &str) -> String {
    let level = match level.trim().to_ascii_lowercase().as_str() {
        "verbose" => "trace".to_string(),
        "fatal" => "error".to_string(),
        "" => "info".to_string(),
        other => other.to_string(),
    };
    format!("{CRATE_TARGET}={level}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_level_names_map_to_tracing_levels() {
        assert_eq!(directive_for("verbose"), "subconverter=trace");
        assert_eq!(directive_for("FATAL"), "subconverter=error");
        assert_eq!(directive_for(""), "subconverter=info");
        assert_eq!(directive_for("warn"), "subconverter=warn");
    }

    #[test]
    fn apply_level_without_subscriber_is_noop() {
        apply_level("debug");
    }
}
