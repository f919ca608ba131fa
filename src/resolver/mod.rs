//! Dependency resolution.
//!
//! Resolution is flat: every dependency declared in `Project.toml` is matched
//! against the catalog on its own, with no transitive graph. The resolver is
//! pure and deterministic - all I/O happens before resolution.

pub mod errors;
pub mod version;

pub use errors::ResolveError;
pub use version::{MatchStrategy, PrefixMatcher, SemverMatcher, VersionMatcher};

use std::fmt;

use crate::core::catalog::{Catalog, CatalogVersion};
use crate::core::dependency::{DependencyDecl, VersionSpec};

/// A dependency pinned to one catalog version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependency {
    pub name: String,
    pub version: String,
    pub url: String,
}

impl fmt::Display for ResolvedDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}", self.name, self.version)
    }
}

/// Matches version specs against the catalog.
pub struct Resolver {
    matcher: Box<dyn VersionMatcher>,
}

impl Resolver {
    /// Create a resolver for the given strategy.
    pub fn new(strategy: MatchStrategy) -> Self {
        Resolver {
            matcher: strategy.matcher(),
        }
    }

    /// Create a resolver with a custom matcher.
    pub fn with_matcher(matcher: Box<dyn VersionMatcher>) -> Self {
        Resolver { matcher }
    }

    /// Resolve one library.
    ///
    /// Versions are tried newest first; the first one the matcher accepts wins.
    pub fn resolve<'a>(
        &self,
        catalog: &'a Catalog,
        name: &str,
        spec: &VersionSpec,
    ) -> Result<&'a CatalogVersion, ResolveError> {
        let library = catalog
            .find(name)
            .ok_or_else(|| ResolveError::LibraryNotFound {
                name: name.to_string(),
                suggestions: catalog.similar_names(name),
            })?;

        let chosen = library
            .newest_first()
            .find(|v| self.matcher.matches(&v.version, spec))
            .ok_or_else(|| ResolveError::NoMatchingVersion {
                name: name.to_string(),
                spec: spec.to_string(),
                available: library.version_strings(),
            })?;

        tracing::debug!(
            "resolved {} {} -> {} ({} matcher)",
            name,
            spec,
            chosen.version,
            self.matcher.name()
        );

        Ok(chosen)
    }

    /// Resolve every declaration in order, stopping at the first failure.
    pub fn resolve_all(
        &self,
        catalog: &Catalog,
        decls: &[DependencyDecl],
    ) -> Result<Vec<ResolvedDependency>, ResolveError> {
        decls
            .iter()
            .map(|decl| {
                self.resolve(catalog, &decl.name, &decl.spec)
                    .map(|v| ResolvedDependency {
                        name: decl.name.clone(),
                        version: v.version.clone(),
                        url: v.url.clone(),
                    })
            })
            .collect()
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Resolver::new(MatchStrategy::default())
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("matcher", &self.matcher.name())
            .finish()
    }
}
