//! Startup-only environment overrides.
//!
//! Read once into [`EnvOverrides`] before the listener starts. The captured
//! value is re-applied on every later load; the environment itself is never
//! consulted again.

/// A boolean that may be left unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tribool {
    #[default]
    Indeterminate,
    True,
    False,
}

impl Tribool {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Tribool::True,
            "false" | "0" | "no" | "off" => Tribool::False,
            _ => Tribool::Indeterminate,
        }
    }

    /// The set value, or `default` when indeterminate.
    pub fn get(self, default: bool) -> bool {
        match self {
            Tribool::True => true,
            Tribool::False => false,
            Tribool::Indeterminate => default,
        }
    }
}

pub const ENV_API_MODE: &str = "API_MODE";
pub const ENV_MANAGED_PREFIX: &str = "MANAGED_PREFIX";
pub const ENV_API_TOKEN: &str = "API_TOKEN";
pub const ENV_PORT: &str = "PORT";

/// Values taken from the environment at startup. Empty variables count as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvOverrides {
    pub api_mode: Tribool,
    pub managed_prefix: Option<String>,
    pub access_token: Option<String>,
    pub port: Option<u16>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let port = get(ENV_PORT).and_then(|raw| match raw.trim().parse::<u16>() {
            Ok(port) if port != 0 => Some(port),
            _ => {
                tracing::warn!(value = %raw, "Ignoring invalid {}", ENV_PORT);
                None
            }
        });

        Self {
            api_mode: get(ENV_API_MODE)
                .map(|v| Tribool::parse(&v))
                .unwrap_or_default(),
            managed_prefix: get(ENV_MANAGED_PREFIX),
            access_token: get(ENV_API_TOKEN),
            port,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn tribool_parsing() {
        assert_eq!(Tribool::parse("TRUE"), Tribool::True);
        assert_eq!(Tribool::parse("0"), Tribool::False);
        assert_eq!(Tribool::parse("maybe"), Tribool::Indeterminate);
        assert!(Tribool::Indeterminate.get(true));
        assert!(!Tribool::False.get(true));
    }

    #[test]
    fn reads_all_variables() {
        let env = EnvOverrides::from_lookup(lookup(&[
            ("API_MODE", "false"),
            ("MANAGED_PREFIX", "https://sub.example.com"),
            ("API_TOKEN", "secret"),
            ("PORT", "9999"),
        ]));
        assert_eq!(env.api_mode, Tribool::False);
        assert_eq!(env.managed_prefix.as_deref(), Some("https://sub.example.com"));
        assert_eq!(env.access_token.as_deref(), Some("secret"));
        assert_eq!(env.port, Some(9999));
    }

    #[test]
    fn empty_and_invalid_values_are_absent() {
        let env = EnvOverrides::from_lookup(lookup(&[
            ("API_TOKEN", ""),
            ("PORT", "not-a-port"),
            ("API_MODE", ""),
        ]));
        assert!(env.is_empty());
    }
}
