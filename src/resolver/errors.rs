//! Resolution error types and diagnostics.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Error during dependency resolution.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum ResolveError {
    #[error("library `{name}` not found in catalog")]
    #[diagnostic(
        code(virus::resolve::library_not_found),
        help("Check the library name against the catalog")
    )]
    LibraryNotFound {
        name: String,
        suggestions: Vec<String>,
    },

    #[error("no version of `{name}` matches `{spec}`")]
    #[diagnostic(
        code(virus::resolve::no_matching_version),
        help("Loosen the version spec in Project.toml, or use `*` for the latest release")
    )]
    NoMatchingVersion {
        name: String,
        spec: String,
        available: Vec<String>,
    },
}

impl ResolveError {
    /// Name of the library that failed to resolve.
    pub fn library(&self) -> &str {
        match self {
            ResolveError::LibraryNotFound { name, .. } => name,
            ResolveError::NoMatchingVersion { name, .. } => name,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ResolveError::LibraryNotFound {
                name,
                suggestions: similar,
            } => {
                let mut diag =
                    Diagnostic::error(format!("library `{}` not found in catalog", name));

                if !similar.is_empty() {
                    diag = diag.with_context(format!("did you mean: {}?", similar.join(", ")));
                }

                diag.with_suggestion(suggestions::LIBRARY_NOT_FOUND)
                    .with_suggestion(format!("Remove it with `virus remove {}`", name))
            }

            ResolveError::NoMatchingVersion {
                name,
                spec,
                available,
            } => {
                let mut diag = Diagnostic::error(format!(
                    "no version of `{}` matches `{}`",
                    name, spec
                ));

                if available.is_empty() {
                    diag = diag.with_context("the catalog lists no versions for this library");
                } else {
                    diag = diag.with_context(format!(
                        "available versions: {}",
                        available.join(", ")
                    ));
                }

                diag.with_suggestion(format!(
                    "Update the version spec for `{}` in Project.toml",
                    name
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_matching_version_diagnostic() {
        let err = ResolveError::NoMatchingVersion {
            name: "json".to_string(),
            spec: "9.9.9".to_string(),
            available: vec!["1.0.0".to_string(), "1.2.0".to_string()],
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("no version of `json` matches `9.9.9`"));
        assert!(output.contains("available versions: 1.0.0, 1.2.0"));
        assert_eq!(err.library(), "json");
    }

    #[test]
    fn test_library_not_found_diagnostic() {
        let err = ResolveError::LibraryNotFound {
            name: "jsn".to_string(),
            suggestions: vec!["json".to_string()],
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("library `jsn` not found"));
        assert!(output.contains("did you mean: json?"));
        assert!(output.contains("virus remove jsn"));
    }

    #[test]
    fn test_miette_codes() {
        let err = ResolveError::LibraryNotFound {
            name: "x".to_string(),
            suggestions: Vec::new(),
        };
        let code = MietteDiagnostic::code(&err).map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("virus::resolve::library_not_found"));
    }
}
