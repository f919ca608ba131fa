//! Host <-> sandbox path translation.
//!
//! The workspace directory is mounted at a fixed point inside the session.
//! Sandbox paths are always `/`-separated regardless of the host platform.

use std::path::{Component, Path, PathBuf};

/// Maps paths between the host workspace and its mount point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxPaths {
    host_root: PathBuf,
    sandbox_root: String,
}

impl SandboxPaths {
    pub fn new(host_root: impl Into<PathBuf>, sandbox_root: impl Into<String>) -> Self {
        let sandbox_root: String = sandbox_root.into();
        let trimmed = sandbox_root.trim_end_matches('/');
        SandboxPaths {
            host_root: host_root.into(),
            sandbox_root: if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() },
        }
    }

    /// Host side of the mount.
    pub fn host_root(&self) -> &Path {
        &self.host_root
    }

    /// Sandbox side of the mount.
    pub fn sandbox_root(&self) -> &str {
        &self.sandbox_root
    }

    /// Sandbox path for a workspace-relative path like `src/main.vira`.
    pub fn join(&self, relative: &str) -> String {
        let relative = relative.trim_start_matches('/');
        if relative.is_empty() {
            self.sandbox_root.clone()
        } else if self.sandbox_root == "/" {
            format!("/{}", relative)
        } else {
            format!("{}/{}", self.sandbox_root, relative)
        }
    }

    /// Translate a host path under the workspace into its sandbox path.
    pub fn to_sandbox(&self, host: &Path) -> Option<String> {
        let rel = host.strip_prefix(&self.host_root).ok()?;
        let mut parts = Vec::new();
        for component in rel.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_str()?.to_string()),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(self.join(&parts.join("/")))
    }

    /// Translate a sandbox path under the mount point back to the host.
    pub fn to_host(&self, sandbox: &str) -> Option<PathBuf> {
        let rel = if self.sandbox_root == "/" {
            sandbox.strip_prefix('/')?
        } else {
            let rest = sandbox.strip_prefix(self.sandbox_root.as_str())?;
            if rest.is_empty() {
                rest
            } else {
                // Must end on a segment boundary: `/workshop` is not under `/work`
                rest.strip_prefix('/')?
            }
        };

        let mut host = self.host_root.clone();
        for part in rel.split('/').filter(|p| !p.is_empty() && *p != ".") {
            if part == ".." {
                return None;
            }
            host.push(part);
        }
        Some(host)
    }
}
