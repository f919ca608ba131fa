//! Ephemeral build workspace.
//!
//! Layout (mounted at `/work` inside the sandbox):
//!
//! ```text
//! Project.toml
//! src/...
//! .virus_deps/<name>/<version>/<artifact>
//! bin/
//! ```
//!
//! The directory is deleted when the workspace is dropped.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::core::manifest::{Manifest, PROJECT_MANIFEST};
use crate::resolver::ResolvedDependency;
use crate::util::fs;

/// Directory holding dependency artifacts inside the workspace.
pub const DEPS_DIR: &str = ".virus_deps";

/// A resolved dependency together with its cached artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDependency {
    pub resolved: ResolvedDependency,
    pub artifact: PathBuf,
}

impl LocalDependency {
    /// Workspace-relative directory of this dependency.
    pub fn relative_dir(&self) -> String {
        format!(
            "{}/{}/{}",
            DEPS_DIR, self.resolved.name, self.resolved.version
        )
    }

    /// File name of the artifact.
    pub fn file_name(&self) -> String {
        self.artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// The staged copy of a project that a build runs against.
#[derive(Debug)]
pub struct BuildWorkspace {
    dir: TempDir,
    package: String,
}

impl BuildWorkspace {
    /// Create and populate a workspace under the system temp directory.
    pub fn create(manifest: &Manifest, deps: &[LocalDependency]) -> Result<Self> {
        Self::create_in(&std::env::temp_dir(), manifest, deps)
    }

    /// Create and populate a workspace under `parent`.
    pub fn create_in(parent: &Path, manifest: &Manifest, deps: &[LocalDependency]) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("virus-build-")
            .tempdir_in(parent)
            .with_context(|| format!("failed to create build workspace in {}", parent.display()))?;
        let root = dir.path();
        tracing::debug!("build workspace at {}", root.display());

        fs::copy_file(&manifest.manifest_path(), &root.join(PROJECT_MANIFEST))?;

        let src = manifest.src_dir();
        if src.is_dir() {
            fs::copy_dir_all(&src, &root.join("src"))?;
        }

        for dep in deps {
            let dest = root.join(dep.relative_dir()).join(dep.file_name());
            fs::copy_file(&dep.artifact, &dest)
                .with_context(|| format!("failed to stage dependency `{}`", dep.resolved.name))?;
        }

        fs::ensure_dir(&root.join("bin"))?;

        Ok(BuildWorkspace {
            dir,
            package: manifest.name().to_string(),
        })
    }

    /// Host path of the workspace root.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Package being built.
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Host path of the entry point.
    pub fn main_source(&self) -> PathBuf {
        self.root().join("src").join("main.vira")
    }

    /// Workspace-relative path of the linked executable.
    pub fn binary_relative(&self) -> String {
        format!("bin/{}", self.package)
    }

    /// Host path of the linked executable.
    pub fn binary_path(&self) -> PathBuf {
        self.root().join("bin").join(&self.package)
    }

    /// Delete the workspace now, reporting errors.
    pub fn close(self) -> Result<()> {
        let path = self.root().to_path_buf();
        self.dir
            .close()
            .with_context(|| format!("failed to remove build workspace {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_project;
    use tempfile::TempDir;

    #[test]
    fn test_workspace_layout() {
        let project = TempDir::new().unwrap();
        let manifest = write_project(project.path(), "demo", &[]);
        std::fs::create_dir_all(project.path().join("src/util")).unwrap();
        std::fs::write(project.path().join("src/util/io.vira"), "").unwrap();

        let store = TempDir::new().unwrap();
        let artifact = store.path().join("json-1.0.0.vira");
        std::fs::write(&artifact, "int json();").unwrap();
        let dep = LocalDependency {
            resolved: ResolvedDependency {
                name: "json".to_string(),
                version: "1.0.0".to_string(),
                url: "https://example.com/json-1.0.0.vira".to_string(),
            },
            artifact,
        };
        assert_eq!(dep.relative_dir(), ".virus_deps/json/1.0.0");

        let scratch = TempDir::new().unwrap();
        let ws = BuildWorkspace::create_in(scratch.path(), &manifest, &[dep]).unwrap();
        let root = ws.root().to_path_buf();

        assert!(root.join("Project.toml").is_file());
        assert!(ws.main_source().is_file());
        assert!(root.join("src/util/io.vira").is_file());
        assert_eq!(
            std::fs::read_to_string(root.join(".virus_deps/json/1.0.0/json-1.0.0.vira")).unwrap(),
            "int json();"
        );
        assert!(root.join("bin").is_dir());
        assert_eq!(ws.binary_path(), root.join("bin/demo"));
        assert_eq!(ws.binary_relative(), "bin/demo");

        drop(ws);
        assert!(!root.exists());
    }

    #[test]
    fn test_close_removes_directory() {
        let project = TempDir::new().unwrap();
        let manifest = write_project(project.path(), "demo", &[]);
        let scratch = TempDir::new().unwrap();

        let ws = BuildWorkspace::create_in(scratch.path(), &manifest, &[]).unwrap();
        let root = ws.root().to_path_buf();
        ws.close().unwrap();
        assert!(!root.exists());
    }
}
