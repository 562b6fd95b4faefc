//! Preference loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::Preferences;
use crate::config::validation::{validate, ValidationError};

/// Error type for preference loading and persisting.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed form data: {0}")]
    Form(String),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate preference text. `path` is only used for messages.
pub fn parse_preferences(text: &str, path: &Path) -> Result<Preferences, ConfigError> {
    let prefs: Preferences = toml::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    validate(&prefs).map_err(ConfigError::Validation)?;

    Ok(prefs)
}

/// Load and validate preferences from a TOML file.
pub fn load_preferences(path: &Path) -> Result<Preferences, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_preferences(&content, path)
}
