//! Version matching strategies.
//!
//! The resolver walks a library's versions newest first and takes the first
//! one the active [`VersionMatcher`] accepts.

use std::fmt;
use std::str::FromStr;

use semver::{Version, VersionReq};

use crate::core::dependency::VersionSpec;

/// Decides whether a published version satisfies a spec.
pub trait VersionMatcher: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Check a candidate version string against a spec.
    fn matches(&self, candidate: &str, spec: &VersionSpec) -> bool;
}

/// Textual matching: `^rest` is a literal string prefix.
///
/// `^1.` therefore accepts `1.2.0` and `1.10.3`, while `^1` also accepts
/// `10.0.0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrefixMatcher;

impl VersionMatcher for PrefixMatcher {
    fn name(&self) -> &'static str {
        "prefix"
    }

    fn matches(&self, candidate: &str, spec: &VersionSpec) -> bool {
        match spec {
            VersionSpec::Any => true,
            VersionSpec::Prefix(rest) => candidate.starts_with(rest.as_str()),
            VersionSpec::Exact(v) => candidate == v,
        }
    }
}

/// Semantic-version matching.
///
/// `^rest` becomes a caret requirement on the (leniently parsed) prefix,
/// and exact specs that start with a comparison operator are parsed as
/// full requirements. Candidates that are not valid versions only match
/// exact specs by string equality.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemverMatcher;

impl SemverMatcher {
    fn caret_req(rest: &str) -> Option<VersionReq> {
        let trimmed = rest.trim().trim_end_matches('.');
        if trimmed.is_empty() {
            return Some(VersionReq::STAR);
        }
        VersionReq::parse(&format!("^{}", trimmed)).ok()
    }
}

impl VersionMatcher for SemverMatcher {
    fn name(&self) -> &'static str {
        "semver"
    }

    fn matches(&self, candidate: &str, spec: &VersionSpec) -> bool {
        match spec {
            VersionSpec::Any => true,
            VersionSpec::Prefix(rest) => match (Self::caret_req(rest), parse_version_lenient(candidate)) {
                (Some(req), Some(version)) => req.matches(&version),
                // Unparseable on either side: fall back to the textual rule
                _ => candidate.starts_with(rest.as_str()),
            },
            VersionSpec::Exact(v) => {
                if candidate == v {
                    return true;
                }
                let Some(version) = parse_version_lenient(candidate) else {
                    return false;
                };
                if v.starts_with(['>', '<', '=', '~']) {
                    return VersionReq::parse(v).is_ok_and(|req| req.matches(&version));
                }
                parse_version_lenient(v).is_some_and(|wanted| wanted == version)
            }
        }
    }
}

/// Selectable matching strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchStrategy {
    #[default]
    Prefix,
    Semver,
}

impl MatchStrategy {
    /// Instantiate the matcher for this strategy.
    pub fn matcher(self) -> Box<dyn VersionMatcher> {
        match self {
            MatchStrategy::Prefix => Box::new(PrefixMatcher),
            MatchStrategy::Semver => Box::new(SemverMatcher),
        }
    }
}

impl FromStr for MatchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "prefix" => Ok(MatchStrategy::Prefix),
            "semver" => Ok(MatchStrategy::Semver),
            _ => Err(format!(
                "unknown strategy '{}'; expected 'prefix' or 'semver'",
                s
            )),
        }
    }
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStrategy::Prefix => write!(f, "prefix"),
            MatchStrategy::Semver => write!(f, "semver"),
        }
    }
}

/// Parse a version string, allowing for incomplete versions.
pub fn parse_version_lenient(s: &str) -> Option<Version> {
    let s = s.trim().trim_start_matches('v');

    // Try exact parse first
    if let Ok(v) = s.parse() {
        return Some(v);
    }

    // Try adding missing components
    let parts: Vec<&str> = s.split('.').collect();
    match parts.len() {
        1 => {
            let major: u64 = parts[0].parse().ok()?;
            Some(Version::new(major, 0, 0))
        }
        2 => {
            let major: u64 = parts[0].parse().ok()?;
            let minor: u64 = parts[1].parse().ok()?;
            Some(Version::new(major, minor, 0))
        }
        _ => None,
    }
}
