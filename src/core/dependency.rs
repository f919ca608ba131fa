//! Dependency declarations.
//!
//! A declaration pairs a library name with the version spec written in
//! `Project.toml`. Specs come in three shapes: `*`, `^prefix`, and an exact
//! version string.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// A version spec as written in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum VersionSpec {
    /// `*`: the latest published version
    #[default]
    Any,
    /// `^rest`: the body after the caret
    Prefix(String),
    /// Anything else
    Exact(String),
}

impl VersionSpec {
    /// Classify a spec string. Never fails; unknown shapes are exact matches.
    ///
    /// The text is taken verbatim, so `" 1.0.0 "` is an exact spec that no
    /// published version equals.
    pub fn parse(s: &str) -> Self {
        if s == "*" {
            VersionSpec::Any
        } else if let Some(rest) = s.strip_prefix('^') {
            VersionSpec::Prefix(rest.to_string())
        } else {
            VersionSpec::Exact(s.to_string())
        }
    }
}

impl FromStr for VersionSpec {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(VersionSpec::parse(s))
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSpec::Any => write!(f, "*"),
            VersionSpec::Prefix(rest) => write!(f, "^{}", rest),
            VersionSpec::Exact(v) => write!(f, "{}", v),
        }
    }
}

/// A dependency as declared in the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyDecl {
    /// Library name in the catalog
    pub name: String,

    /// Acceptable versions
    pub spec: VersionSpec,
}

impl DependencyDecl {
    /// Create a new declaration.
    pub fn new(name: impl Into<String>, spec: VersionSpec) -> Self {
        DependencyDecl {
            name: name.into(),
            spec,
        }
    }
}

impl fmt::Display for DependencyDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_spec_shapes() {
        assert_eq!(VersionSpec::parse("*"), VersionSpec::Any);
        assert_eq!(VersionSpec::parse("^1."), VersionSpec::Prefix("1.".into()));
        assert_eq!(VersionSpec::parse("1.2.0"), VersionSpec::Exact("1.2.0".into()));
        assert_eq!(VersionSpec::parse(" * "), VersionSpec::Exact(" * ".into()));
        assert_eq!(
            VersionSpec::parse(" 1.0.0 "),
            VersionSpec::Exact(" 1.0.0 ".into())
        );
    }

    #[test]
    fn test_caret_alone_is_empty_prefix() {
        assert_eq!(VersionSpec::parse("^"), VersionSpec::Prefix(String::new()));
    }

    #[test]
    fn test_display_restores_source_form() {
        for s in ["*", "^2.1", "0.3.0-beta"] {
            assert_eq!(VersionSpec::parse(s).to_string(), s);
        }
    }

    #[test]
    fn test_decl_display() {
        let decl = DependencyDecl::new("json", "^1.".parse().unwrap());
        assert_eq!(decl.to_string(), "json ^1.");
    }
}
