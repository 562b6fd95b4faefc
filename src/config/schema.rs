//! Preference file schema.
//!
//! This module defines the complete preference structure for the service.
//! All types derive Serde traits for deserialization from TOML, and every
//! section has defaults so a minimal (or empty) file is valid.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root of the preference file.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct Preferences {
    /// API behaviour and access control.
    pub common: CommonConfig,

    /// Listen address and port.
    pub server: ServerSection,

    /// Transport limits and diagnostics.
    pub advanced: AdvancedConfig,

    /// Ruleset refresh policy.
    pub ruleset: RulesetConfig,

    /// Ordered ruleset sources. Tags may repeat.
    pub rulesets: Vec<RulesetEntry>,

    /// Base templates per target, loaded by artifact regeneration.
    pub templates: BTreeMap<String, String>,

    /// Generator mode profiles.
    pub artifacts: Vec<ArtifactConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct CommonConfig {
    /// Restricted mode: `/get` and `/getlocal` are not registered.
    pub api_mode: bool,

    /// Token required on administrative routes. Empty disables the check.
    pub api_access_token: String,

    /// URL prefix injected into generated subscription links.
    pub managed_config_prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerSection {
    /// Bind address (IP literal).
    pub listen: String,

    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0".to_string(),
            port: 25500,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdvancedConfig {
    /// Log level used when `RUST_LOG` is not set.
    pub log_level: String,

    /// Accept backlog handed to the kernel.
    pub max_pending_connections: u32,

    /// Number of connections served at once.
    pub max_concurrent_threads: usize,

    /// Largest request body accepted, in bytes.
    pub max_body_size: usize,

    /// Prometheus exporter address. Empty disables it.
    pub metrics_address: String,
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            max_pending_connections: 10240,
            max_concurrent_threads: 4,
            max_body_size: 2 * 1024 * 1024, // 2MB
            metrics_address: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RulesetConfig {
    /// When false the source list is treated as empty.
    pub enabled: bool,

    /// Refresh inside converter requests instead of eagerly.
    pub update_ruleset_on_request: bool,
}

impl Default for RulesetConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            update_ruleset_on_request: false,
        }
    }
}

/// One `[[rulesets]]` entry.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RulesetEntry {
    /// Proxy group the rules feed.
    pub group: String,

    /// `[kind:]origin` locator.
    pub ruleset: String,

    /// Explicit kind; overrides a locator prefix.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// One `[[artifacts]]` generator profile.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ArtifactConfig {
    pub name: String,

    /// Output file.
    pub path: String,

    /// Conversion target, e.g. "clash".
    pub target: String,

    /// Subscription URL(s) to convert.
    #[serde(default)]
    pub url: String,

    /// Extra query arguments passed to the converter.
    #[serde(default)]
    pub args: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let prefs: Preferences = toml::from_str("").unwrap();
        assert_eq!(prefs, Preferences::default());
        assert_eq!(prefs.server.port, 25500);
        assert!(prefs.ruleset.enabled);
    }

    #[test]
    fn full_file_parses() {
        let prefs: Preferences = toml::from_str(
            r#"
            [common]
            api_mode = true
            api_access_token = "secret"

            [server]
            listen = "127.0.0.1"
            port = 8080

            [advanced]
            max_concurrent_threads = 16

            [[rulesets]]
            group = "Proxy"
            ruleset = "clash-domain:https://example.com/a.yaml"

            [[rulesets]]
            group = "Direct"
            ruleset = "rules/lan.list"
            type = "surge"

            [templates]
            clash = "base/clash.tpl"

            [[artifacts]]
            name = "clash"
            path = "out/clash.yaml"
            target = "clash"
            url = "https://example.com/sub"
            args = { emoji = "true" }
            "#,
        )
        .unwrap();

        assert!(prefs.common.api_mode);
        assert_eq!(prefs.server.port, 8080);
        assert_eq!(prefs.advanced.max_concurrent_threads, 16);
        assert_eq!(prefs.advanced.max_pending_connections, 10240);
        assert_eq!(prefs.rulesets.len(), 2);
        assert_eq!(prefs.rulesets[1].kind.as_deref(), Some("surge"));
        assert_eq!(prefs.templates["clash"], "base/clash.tpl");
        assert_eq!(prefs.artifacts[0].args["emoji"], "true");
    }
}
