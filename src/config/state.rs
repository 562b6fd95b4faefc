//! Runtime state and server configuration derived from preferences.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::env::EnvOverrides;
use crate::config::schema::Preferences;
use crate::ruleset::RulesetSource;

/// Flags fixed by the command line for the life of the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaunchFlags {
    /// Started as a child worker (`-cfw`); forces on-request ruleset refresh.
    pub child_process: bool,
}

/// The values handlers read on every request.
///
/// Replaced as a whole on reload, so one snapshot is always consistent.
#[derive(Debug, Clone)]
pub struct RuntimeState {
    pub preference_path: PathBuf,
    pub access_token: String,
    pub api_mode: bool,
    pub managed_prefix: String,
    pub update_ruleset_on_request: bool,
    pub child_process: bool,
    /// Ordered ruleset sources; empty when the ruleset generator is disabled.
    pub rulesets: Arc<[RulesetSource]>,
    pub preferences: Arc<Preferences>,
}

impl RuntimeState {
    pub fn build(
        path: &Path,
        prefs: Preferences,
        launch: LaunchFlags,
        overrides: &EnvOverrides,
    ) -> Self {
        let rulesets: Vec<RulesetSource> = if prefs.ruleset.enabled {
            prefs
                .rulesets
                .iter()
                .filter_map(|entry| {
                    RulesetSource::parse(&entry.group, &entry.ruleset, entry.kind.as_deref())
                        .map_err(|e| {
                            tracing::warn!(group = %entry.group, error = %e, "Skipping ruleset");
                        })
                        .ok()
                })
                .collect()
        } else {
            Vec::new()
        };

        Self {
            preference_path: path.to_path_buf(),
            access_token: overrides
                .access_token
                .clone()
                .unwrap_or_else(|| prefs.common.api_access_token.clone()),
            api_mode: overrides.api_mode.get(prefs.common.api_mode),
            managed_prefix: overrides
                .managed_prefix
                .clone()
                .unwrap_or_else(|| prefs.common.managed_config_prefix.clone()),
            update_ruleset_on_request: prefs.ruleset.update_ruleset_on_request
                || launch.child_process,
            child_process: launch.child_process,
            rulesets: rulesets.into(),
            preferences: Arc::new(prefs),
        }
    }
}

/// Listener settings. Fixed once the listener starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_address: IpAddr,
    pub port: u16,
    pub backlog: u32,
    pub max_workers: usize,
    pub max_body_size: usize,
}

impl ServerConfig {
    pub fn from_preferences(prefs: &Preferences) -> Self {
        Self {
            bind_address: prefs
                .server
                .listen
                .parse()
                .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            port: prefs.server.port,
            backlog: prefs.advanced.max_pending_connections.max(1),
            max_workers: prefs.advanced.max_concurrent_threads.max(1),
            max_body_size: prefs.advanced.max_body_size,
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_preferences(&Preferences::default())
    }
}
