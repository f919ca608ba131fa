//! Project.toml manifest parsing and schema.
//!
//! The manifest names the package and lists its direct dependencies as a
//! flat `name = "version-spec"` table.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::dependency::{DependencyDecl, VersionSpec};

/// File name of the project manifest.
pub const PROJECT_MANIFEST: &str = "Project.toml";

/// Manifest lookup errors.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("could not find `Project.toml` in `{}` or any parent directory", dir.display())]
    NotFound { dir: PathBuf },
}

/// Package metadata from the [package] section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Package name, also the name of the produced executable
    pub name: String,

    /// Package version
    pub version: String,
}

/// The parsed Project.toml manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Package metadata
    pub package: PackageMetadata,

    /// Direct dependencies, name -> version spec
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    /// The directory containing this manifest
    #[serde(skip)]
    pub manifest_dir: PathBuf,
}

impl Manifest {
    /// Load a manifest from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;

        Self::parse(&content, path)
    }

    /// Parse manifest content.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let mut manifest: Manifest = toml::from_str(content)
            .with_context(|| format!("failed to parse manifest: {}", path.display()))?;

        if manifest.package.name.trim().is_empty() {
            anyhow::bail!("{}: `package.name` cannot be empty", path.display());
        }

        manifest.manifest_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(manifest)
    }

    /// Serialize the manifest back to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).context("failed to serialize manifest")
    }

    /// Package name.
    pub fn name(&self) -> &str {
        &self.package.name
    }

    /// Dependency declarations in lexicographic name order.
    pub fn dependency_decls(&self) -> Vec<DependencyDecl> {
        self.dependencies
            .iter()
            .map(|(name, spec)| DependencyDecl::new(name.clone(), VersionSpec::parse(spec)))
            .collect()
    }

    /// Path of the manifest file.
    pub fn manifest_path(&self) -> PathBuf {
        self.manifest_dir.join(PROJECT_MANIFEST)
    }

    /// Directory holding the project's sources.
    pub fn src_dir(&self) -> PathBuf {
        self.manifest_dir.join("src")
    }
}

/// Return the manifest path in `dir` if one exists.
pub fn find_manifest(dir: &Path) -> Option<PathBuf> {
    let path = dir.join(PROJECT_MANIFEST);
    path.is_file().then_some(path)
}

/// Generate a default Project.toml for a new package.
pub fn generate_default_manifest(name: &str) -> String {
    format!(
        r#"[package]
name = "{name}"
version = "0.1.0"

[dependencies]
"#
    )
}

/// Entry point written by `virus init`.
pub const DEFAULT_MAIN_SOURCE: &str = "int main() {\n\treturn 0;\n}\n";
