//! The library catalog.
//!
//! The catalog lists every published library with its versions in publish
//! order, oldest first. The last entry is the latest release.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One published version of a library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogVersion {
    /// Version string, unique within its library
    pub version: String,

    /// Download URL of the artifact
    pub url: String,
}

/// A library and its published versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    pub name: String,

    /// Oldest first
    #[serde(default)]
    pub versions: Vec<CatalogVersion>,
}

impl Library {
    /// The most recently published version.
    pub fn latest(&self) -> Option<&CatalogVersion> {
        self.versions.last()
    }

    /// Iterate versions newest first.
    pub fn newest_first(&self) -> impl Iterator<Item = &CatalogVersion> {
        self.versions.iter().rev()
    }

    /// Version strings in publish order.
    pub fn version_strings(&self) -> Vec<String> {
        self.versions.iter().map(|v| v.version.clone()).collect()
    }
}

/// The full catalog document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub libraries: Vec<Library>,
}

impl Catalog {
    /// Parse a catalog from its JSON form.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).context("failed to parse library catalog")
    }

    /// Look up a library by exact name.
    pub fn find(&self, name: &str) -> Option<&Library> {
        self.libraries.iter().find(|lib| lib.name == name)
    }

    /// Names of libraries that look like `name`, for "did you mean" hints.
    pub fn similar_names(&self, name: &str) -> Vec<String> {
        let needle = name.to_lowercase();
        self.libraries
            .iter()
            .filter(|lib| {
                let candidate = lib.name.to_lowercase();
                candidate != needle && (candidate.contains(&needle) || needle.contains(&candidate))
            })
            .map(|lib| lib.name.clone())
            .collect()
    }
}
