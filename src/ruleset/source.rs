//! Ruleset source definitions and locator parsing.
//!
//! A locator is `[kind:]origin`, where origin is an inline rule (`[]RULE`),
//! an `http(s)://` URL, or a local path. Kind defaults to `surge`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Rule list dialect of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RulesetKind {
    Surge,
    QuantumultX,
    ClashDomain,
    ClashIpCidr,
    ClashClassical,
}

impl RulesetKind {
    const ALL: [RulesetKind; 5] = [
        RulesetKind::Surge,
        RulesetKind::QuantumultX,
        RulesetKind::ClashDomain,
        RulesetKind::ClashIpCidr,
        RulesetKind::ClashClassical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RulesetKind::Surge => "surge",
            RulesetKind::QuantumultX => "quanx",
            RulesetKind::ClashDomain => "clash-domain",
            RulesetKind::ClashIpCidr => "clash-ipcidr",
            RulesetKind::ClashClassical => "clash-classic",
        }
    }

    pub fn is_clash(&self) -> bool {
        matches!(
            self,
            RulesetKind::ClashDomain | RulesetKind::ClashIpCidr | RulesetKind::ClashClassical
        )
    }

    /// Split an optional `kind:` prefix off a locator.
    fn split_prefix(locator: &str) -> (Option<RulesetKind>, &str) {
        for kind in Self::ALL {
            if let Some(rest) = locator
                .strip_prefix(kind.as_str())
                .and_then(|r| r.strip_prefix(':'))
            {
                return (Some(kind), rest);
            }
        }
        (None, locator)
    }
}

impl fmt::Display for RulesetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RulesetKind {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SourceError::UnknownKind(s.to_string()))
    }
}

/// Where a ruleset's content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Remote(String),
    Local(PathBuf),
    /// A single rule written directly in the preference file.
    Inline(String),
}

impl Origin {
    pub fn parse(locator: &str) -> Result<Self, SourceError> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(SourceError::EmptyLocator);
        }
        if let Some(rule) = locator.strip_prefix("[]") {
            if rule.trim().is_empty() {
                return Err(SourceError::EmptyLocator);
            }
            return Ok(Origin::Inline(rule.trim().to_string()));
        }
        if locator.starts_with("http://") || locator.starts_with("https://") {
            return Ok(Origin::Remote(locator.to_string()));
        }
        Ok(Origin::Local(PathBuf::from(locator)))
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Remote(url) => f.write_str(url),
            Origin::Local(path) => write!(f, "{}", path.display()),
            Origin::Inline(rule) => write!(f, "[]{}", rule),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("unknown ruleset type '{0}'")]
    UnknownKind(String),
    #[error("empty ruleset locator")]
    EmptyLocator,
}

/// One configured ruleset: the tag it feeds, its origin and dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulesetSource {
    pub tag: String,
    pub origin: Origin,
    pub kind: RulesetKind,
}

impl RulesetSource {
    /// Parse a `[kind:]origin` locator. An explicit `kind` wins over the prefix.
    pub fn parse(
        tag: impl Into<String>,
        locator: &str,
        kind: Option<&str>,
    ) -> Result<Self, SourceError> {
        let (prefixed, rest) = RulesetKind::split_prefix(locator.trim());
        let kind = match kind {
            Some(k) => k.parse()?,
            None => prefixed.unwrap_or(RulesetKind::Surge),
        };
        Ok(Self {
            tag: tag.into(),
            origin: Origin::parse(rest)?,
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_kind_is_surge() {
        let src = RulesetSource::parse("Proxy", "https://example.com/list", None).unwrap();
        assert_eq!(src.kind, RulesetKind::Surge);
        assert_eq!(src.origin, Origin::Remote("https://example.com/list".into()));
    }

    #[test]
    fn prefix_selects_kind() {
        let src = RulesetSource::parse("Direct", "clash-ipcidr:rules/lan.yaml", None).unwrap();
        assert_eq!(src.kind, RulesetKind::ClashIpCidr);
        assert_eq!(src.origin, Origin::Local(PathBuf::from("rules/lan.yaml")));
    }

    #[test]
    fn explicit_kind_overrides_prefix() {
        let src = RulesetSource::parse("X", "quanx:https://a/b", Some("clash-classic")).unwrap();
        assert_eq!(src.kind, RulesetKind::ClashClassical);
        assert_eq!(src.origin, Origin::Remote("https://a/b".into()));
    }

    #[test]
    fn inline_rule() {
        let src = RulesetSource::parse("Final", "[]FINAL", None).unwrap();
        assert_eq!(src.origin, Origin::Inline("FINAL".into()));
        assert_eq!(src.origin.to_string(), "[]FINAL");
    }

    #[test]
    fn rejects_empty_and_unknown() {
        assert_eq!(
            RulesetSource::parse("a", "  ", None),
            Err(SourceError::EmptyLocator)
        );
        assert_eq!(
            RulesetSource::parse("a", "[]", None),
            Err(SourceError::EmptyLocator)
        );
        assert!(matches!(
            RulesetSource::parse("a", "x", Some("loon")),
            Err(SourceError::UnknownKind(_))
        ));
    }
}
