//! Host-wide artifact store.
//!
//! Artifacts live at `<root>/<name>/<version>/<basename of url path>` and
//! are never re-downloaded once present. Downloads land in a temp file in
//! the destination directory and are renamed into place, so the canonical
//! path only ever holds a complete file.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use url::Url;
use walkdir::WalkDir;

use crate::resolver::ResolvedDependency;
use crate::sources::transport::{FetchError, Transport};
use crate::util::{fs, hash};
use crate::util::shell::{Shell, Status};

const COPY_BUFFER: usize = 64 * 1024;

/// A file found in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedArtifact {
    pub name: String,
    pub version: String,
    pub path: PathBuf,
    pub size: u64,
}

impl CachedArtifact {
    /// SHA-256 of the file. Informational only; nothing is verified.
    pub fn sha256(&self) -> Result<String> {
        hash::sha256_file(&self.path)
    }
}

/// Idempotent fetch-and-cache of dependency artifacts.
pub struct ArtifactStore {
    root: PathBuf,
    transport: Arc<dyn Transport>,
    shell: Arc<Shell>,
    offline: bool,
    /// One lock per destination path; serializes same-key fetches.
    in_flight: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl ArtifactStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, transport: Arc<dyn Transport>, shell: Arc<Shell>) -> Self {
        ArtifactStore {
            root: root.into(),
            transport,
            shell,
            offline: false,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Refuse network fetches for artifacts that are not cached.
    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Canonical location of an artifact.
    pub fn artifact_path(&self, name: &str, version: &str, url: &str) -> Result<PathBuf, FetchError> {
        check_component(name)?;
        check_component(version)?;

        let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl {
            url: url.to_string(),
        })?;
        let file_name = parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| FetchError::InvalidUrl {
                url: url.to_string(),
            })?;
        check_component(file_name)?;

        Ok(self.root.join(name).join(version).join(file_name))
    }

    /// Make sure the artifact is present locally and return its path.
    pub fn ensure(&self, name: &str, version: &str, url: &str) -> Result<PathBuf, FetchError> {
        let dest = self.artifact_path(name, version, url)?;

        let key_lock = self.key_lock(&dest);
        let _guard = key_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if dest.is_file() {
            tracing::debug!("{} v{} already cached at {}", name, version, dest.display());
            return Ok(dest);
        }

        if self.offline {
            return Err(FetchError::Offline {
                name: name.to_string(),
                version: version.to_string(),
            });
        }

        self.download(name, version, url, &dest)?;
        Ok(dest)
    }

    /// Ensure every dependency with at most `jobs` concurrent downloads.
    ///
    /// Returns artifact paths in the same order as `deps`. The first error in
    /// that order is reported.
    pub fn ensure_all(
        &self,
        deps: &[ResolvedDependency],
        jobs: usize,
    ) -> Result<Vec<PathBuf>, FetchError> {
        let fetch = |dep: &ResolvedDependency| self.ensure(&dep.name, &dep.version, &dep.url);

        let results: Vec<Result<PathBuf, FetchError>> = match rayon::ThreadPoolBuilder::new()
            .num_threads(jobs.max(1))
            .build()
        {
            Ok(pool) => pool.install(|| deps.par_iter().map(fetch).collect()),
            Err(e) => {
                tracing::warn!("failed to start download workers, fetching serially: {}", e);
                deps.iter().map(fetch).collect()
            }
        };

        results.into_iter().collect()
    }

    /// List every artifact in the store.
    pub fn list(&self) -> Result<Vec<CachedArtifact>> {
        let mut artifacts = Vec::new();
        if !self.root.exists() {
            return Ok(artifacts);
        }

        for entry in WalkDir::new(&self.root).min_depth(3).max_depth(3).sort_by_file_name() {
            let entry = entry.with_context(|| format!("failed to read {}", self.root.display()))?;
            if !entry.file_type().is_file() || is_temp_file(entry.path()) {
                continue;
            }

            let path = entry.path().to_path_buf();
            let (Some(version_dir), Some(name_dir)) = (path.parent(), path.parent().and_then(Path::parent)) else {
                continue;
            };
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);

            artifacts.push(CachedArtifact {
                name: file_name_string(name_dir),
                version: file_name_string(version_dir),
                path,
                size,
            });
        }

        Ok(artifacts)
    }

    /// Remove cached versions of `name` (all versions when `version` is None).
    ///
    /// Returns the number of version directories removed.
    pub fn remove(&self, name: &str, version: Option<&str>) -> Result<usize> {
        check_component(name)?;
        let lib_dir = self.root.join(name);
        if !lib_dir.is_dir() {
            return Ok(0);
        }

        let targets: Vec<PathBuf> = match version {
            Some(v) => {
                check_component(v)?;
                let dir = lib_dir.join(v);
                if dir.is_dir() { vec![dir] } else { Vec::new() }
            }
            None => std::fs::read_dir(&lib_dir)
                .with_context(|| format!("failed to read {}", lib_dir.display()))?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect(),
        };

        for dir in &targets {
            fs::remove_dir_all_if_exists(dir)?;
        }

        // Drop the library directory once it is empty
        if std::fs::read_dir(&lib_dir).map(|mut d| d.next().is_none()).unwrap_or(false) {
            std::fs::remove_dir(&lib_dir).ok();
        }

        Ok(targets.len())
    }

    fn key_lock(&self, dest: &Path) -> Arc<Mutex<()>> {
        let mut map = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(map.entry(dest.to_path_buf()).or_default())
    }

    fn download(&self, name: &str, version: &str, url: &str, dest: &Path) -> Result<(), FetchError> {
        let dir = dest.parent().unwrap_or(&self.root);
        std::fs::create_dir_all(dir).map_err(|e| FetchError::io(dir, e))?;

        self.shell
            .status(Status::Fetching, format!("{} v{}", name, version));
        tracing::info!("downloading {} from {}", name, url);

        let mut download = self.transport.get(url)?;

        // Removed on drop unless persisted
        let mut tmp = tempfile::Builder::new()
            .prefix(".download-")
            .tempfile_in(dir)
            .map_err(|e| FetchError::io(dir, e))?;

        let mut progress = self
            .shell
            .bytes_progress(format!("{} v{}", name, version), download.content_length);
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; COPY_BUFFER];

        loop {
            let n = download
                .body
                .read(&mut buf)
                .map_err(|e| FetchError::Transport {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            if n == 0 {
                break;
            }
            tmp.write_all(&buf[..n])
                .map_err(|e| FetchError::io(tmp.path(), e))?;
            hasher.update(&buf[..n]);
            progress.inc(n as u64);
        }

        tmp.as_file()
            .sync_all()
            .map_err(|e| FetchError::io(tmp.path(), e))?;
        progress.finish();

        if let Err(e) = tmp.persist(dest) {
            // Another process may have won the race
            if !dest.is_file() {
                return Err(FetchError::io(dest, e.error));
            }
        }

        tracing::debug!(
            "stored {} ({} bytes, sha256 {}, not verified)",
            dest.display(),
            progress.position(),
            hex::encode(hasher.finalize())
        );

        Ok(())
    }
}

impl std::fmt::Debug for ArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactStore")
            .field("root", &self.root)
            .field("offline", &self.offline)
            .finish()
    }
}

fn check_component(s: &str) -> Result<(), FetchError> {
    if s.is_empty() || s == "." || s == ".." || s.contains(['/', '\\']) {
        return Err(FetchError::InvalidKey(s.to_string()));
    }
    Ok(())
}

fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(".download-"))
}

fn file_name_string(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::transport::HttpTransport;
    use tempfile::TempDir;

    fn store(root: &Path) -> ArtifactStore {
        ArtifactStore::new(
            root,
            Arc::new(HttpTransport::new().unwrap()),
            Arc::new(Shell::quiet()),
        )
    }

    #[test]
    fn test_artifact_path_layout() {
        let tmp = TempDir::new().unwrap();
        let store = store(tmp.path());
        let path = store
            .artifact_path("json", "1.2.0", "https://example.com/dl/json-1.2.0.vira?x=1")
            .unwrap();
        assert_eq!(path, tmp.path().join("json/1.2.0/json-1.2.0.vira"));
    }

    #[test]
    fn test_artifact_path_rejects_traversal() {
        let tmp = TempDir::new().unwrap();
        let store = store(tmp.path());
        assert!(matches!(
            store.artifact_path("..", "1.0.0", "https://example.com/a.vira"),
            Err(FetchError::InvalidKey(_))
        ));
        assert!(matches!(
            store.artifact_path("json", "1.0.0", "https://example.com/"),
            Err(FetchError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_ensure_downloads_once() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/json/lib.vira")
            .with_status(200)
            .with_body("int json_parse();")
            .expect(1)
            .create();

        let tmp = TempDir::new().unwrap();
        let store = store(tmp.path());
        let url = format!("{}/json/lib.vira", server.url());

        let first = store.ensure("json", "1.0.0", &url).unwrap();
        let second = store.ensure("json", "1.0.0", &url).unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read_to_string(&first).unwrap(), "int json_parse();");
        mock.assert();
    }

    #[test]
    fn test_ensure_404_leaves_no_file() {
        let mut server = mockito::Server::new();
        let _mock = server.mock("GET", "/gone.vira").with_status(404).create();

        let tmp = TempDir::new().unwrap();
        let store = store(tmp.path());
        let url = format!("{}/gone.vira", server.url());

        let err = store.ensure("gone", "0.1.0", &url).unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));

        let dest = store.artifact_path("gone", "0.1.0", &url).unwrap();
        assert!(!dest.exists());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_offline_uses_cache_only() {
        let tmp = TempDir::new().unwrap();
        let store = store(tmp.path()).with_offline(true);
        let url = "https://example.invalid/m/lib.vira";

        assert!(matches!(
            store.ensure("m", "1.0.0", url),
            Err(FetchError::Offline { .. })
        ));

        let dest = store.artifact_path("m", "1.0.0", url).unwrap();
        std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
        std::fs::write(&dest, "cached").unwrap();
        assert_eq!(store.ensure("m", "1.0.0", url).unwrap(), dest);
    }

    #[test]
    fn test_ensure_all_concurrent_same_key() {
        let mut server = mockito::Server::new();
        let shared = server
            .mock("GET", "/a/lib.vira")
            .with_status(200)
            .with_body("a")
            .expect(1)
            .create();
        let other = server
            .mock("GET", "/b/lib.vira")
            .with_status(200)
            .with_body("b")
            .expect(1)
            .create();

        let tmp = TempDir::new().unwrap();
        let store = store(tmp.path());
        let dep = |name: &str| ResolvedDependency {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            url: format!("{}/{}/lib.vira", server.url(), name),
        };
        let deps = vec![dep("a"), dep("b"), dep("a"), dep("a")];

        let paths = store.ensure_all(&deps, 4).unwrap();
        assert_eq!(paths.len(), 4);
        assert_eq!(paths[0], paths[2]);
        assert_ne!(paths[0], paths[1]);
        shared.assert();
        other.assert();
    }

    #[test]
    fn test_list_and_remove() {
        let tmp = TempDir::new().unwrap();
        let store = store(tmp.path());
        for (name, version) in [("json", "1.0.0"), ("json", "2.0.0"), ("math", "0.1.0")] {
            let dir = tmp.path().join(name).join(version);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("lib.vira"), name).unwrap();
        }
        std::fs::write(tmp.path().join("math/0.1.0/.download-abc"), "partial").unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].name, "json");
        assert_eq!(listed[0].version, "1.0.0");
        assert_eq!(listed[2].size, 4);
        assert_eq!(listed[2].sha256().unwrap().len(), 64);

        assert_eq!(store.remove("json", Some("1.0.0")).unwrap(), 1);
        assert_eq!(store.list().unwrap().len(), 2);
        assert_eq!(store.remove("json", None).unwrap(), 1);
        assert!(!tmp.path().join("json").exists());
        assert_eq!(store.remove("absent", None).unwrap(), 0);
    }
}
