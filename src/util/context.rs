//! Global context for Virus operations.
//!
//! Provides centralized access to configuration, paths, and environment.
//! Platform-dependent locations are captured once in [`Paths`] and handed to
//! components explicitly, so tests can point every root at a temp directory.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use directories::ProjectDirs;

use crate::core::manifest::{find_manifest as find_manifest_in, ManifestError};
use crate::util::config::{load_config, Config};

/// Environment variable overriding the Virus home directory.
pub const HOME_ENV: &str = "VIRUS_HOME";

/// Project directories for Virus
static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("org", "vira-language", "virus"));

/// Host platform constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Directory containing the Vira toolchain binaries.
    pub toolchain_dir: PathBuf,
    /// Suffix appended to host executables (`.exe` on Windows).
    pub exe_suffix: &'static str,
}

impl Paths {
    /// Platform defaults for the running host.
    pub fn host() -> Self {
        if cfg!(windows) {
            let program_files = std::env::var("ProgramFiles")
                .unwrap_or_else(|_| "C:\\Program Files".to_string());
            Paths {
                toolchain_dir: PathBuf::from(program_files).join("ViraLang").join("bin"),
                exe_suffix: ".exe",
            }
        } else {
            Paths {
                toolchain_dir: PathBuf::from("/usr/lib/vira-lang/bin"),
                exe_suffix: "",
            }
        }
    }

    /// Host path of a toolchain binary.
    pub fn tool(&self, toolchain_dir: &Path, name: &str) -> PathBuf {
        toolchain_dir.join(format!("{}{}", name, self.exe_suffix))
    }

    /// Host file name for an executable named `name`.
    pub fn exe_name(&self, name: &str) -> String {
        format!("{}{}", name, self.exe_suffix)
    }
}

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for global Virus data
    home: PathBuf,

    /// Platform constants
    paths: Paths,
}

impl GlobalContext {
    /// Create a new GlobalContext with defaults.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;

        let home = if let Some(home) = std::env::var_os(HOME_ENV).filter(|h| !h.is_empty()) {
            PathBuf::from(home)
        } else if let Some(dirs) = PROJECT_DIRS.as_ref() {
            dirs.cache_dir().to_path_buf()
        } else {
            directories::BaseDirs::new()
                .map(|b| b.home_dir().join(".virus"))
                .unwrap_or_else(|| PathBuf::from(".virus"))
        };

        Ok(GlobalContext {
            cwd,
            home,
            paths: Paths::host(),
        })
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let mut ctx = Self::new()?;
        ctx.cwd = cwd;
        Ok(ctx)
    }

    /// Override the home directory.
    pub fn with_home(mut self, home: PathBuf) -> Self {
        self.home = home;
        self
    }

    /// Override the platform constants.
    pub fn with_paths(mut self, paths: Paths) -> Self {
        self.paths = paths;
        self
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the Virus home directory.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Get the platform constants.
    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    /// Root of the host-wide artifact store.
    pub fn artifact_store_dir(&self) -> PathBuf {
        self.home.join("artifacts")
    }

    /// Get the global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Directory holding the enclosing `Project.toml`, or cwd outside a project.
    pub fn project_root(&self) -> PathBuf {
        self.find_manifest()
            .ok()
            .and_then(|manifest| manifest.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| self.cwd.clone())
    }

    /// Get the project-local configuration file path.
    pub fn project_config_path(&self) -> PathBuf {
        self.project_root().join(".virus").join("config.toml")
    }

    /// Load merged global + project configuration.
    pub fn load_config(&self) -> Config {
        load_config(&self.config_path(), &self.project_config_path())
    }

    /// Find `Project.toml` starting from cwd and searching upward.
    pub fn find_manifest(&self) -> Result<PathBuf, ManifestError> {
        let mut current = self.cwd.clone();
        loop {
            if let Some(path) = find_manifest_in(&current) {
                return Ok(path);
            }
            if !current.pop() {
                return Err(ManifestError::NotFound {
                    dir: self.cwd.clone(),
                });
            }
        }
    }
}
