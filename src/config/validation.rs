//! Preference validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (port, backlog, worker count)
//! - Check every ruleset locator and artifact profile
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Preferences → Result<(), Vec<ValidationError>>
//! - Runs before preferences are accepted into the system

use std::net::{IpAddr, SocketAddr};

use crate::config::schema::Preferences;
use crate::ruleset::{RulesetSource, SourceError};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("server.listen '{0}' is not an IP address")]
    ListenAddress(String),

    #[error("server.port must be non-zero")]
    ZeroPort,

    #[error("advanced.max_pending_connections must be at least 1")]
    ZeroBacklog,

    #[error("advanced.max_concurrent_threads must be at least 1")]
    ZeroWorkers,

    #[error("advanced.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),

    #[error("rulesets[{index}]: {error}")]
    Ruleset { index: usize, error: SourceError },

    #[error("artifacts[{index}]: '{field}' must not be empty")]
    Artifact { index: usize, field: &'static str },
}

pub fn validate(prefs: &Preferences) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if prefs.server.listen.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::ListenAddress(prefs.server.listen.clone()));
    }
    if prefs.server.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }
    if prefs.advanced.max_pending_connections == 0 {
        errors.push(ValidationError::ZeroBacklog);
    }
    if prefs.advanced.max_concurrent_threads == 0 {
        errors.push(ValidationError::ZeroWorkers);
    }
    let metrics = &prefs.advanced.metrics_address;
    if !metrics.is_empty() && metrics.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::MetricsAddress(metrics.clone()));
    }

    for (index, entry) in prefs.rulesets.iter().enumerate() {
        if let Err(error) = RulesetSource::parse(&entry.group, &entry.ruleset, entry.kind.as_deref()) {
            errors.push(ValidationError::Ruleset { index, error });
        }
    }

    for (index, artifact) in prefs.artifacts.iter().enumerate() {
        for (field, value) in [
            ("name", &artifact.name),
            ("path", &artifact.path),
            ("target", &artifact.target),
        ] {
            if value.trim().is_empty() {
                errors.push(ValidationError::Artifact { index, field });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
