//! Configuration file support for Virus.
//!
//! Virus supports two configuration file locations:
//! - Global: `~/.virus/config.toml` - User-wide defaults
//! - Project: `.virus/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config. Every field is
//! optional; the accessors below supply the defaults.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::ToolchainRoles;
use crate::resolver::MatchStrategy;
use crate::sandbox::SandboxSettings;
use crate::util::context::Paths;

/// Default location of the library catalog.
pub const DEFAULT_CATALOG_URL: &str =
    "https://raw.githubusercontent.com/vira-language/vira/main/repository/virus.json";

/// Default number of concurrent artifact downloads.
pub const DEFAULT_JOBS: usize = 4;

/// Virus configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build settings
    pub build: BuildConfig,

    /// Network settings
    pub net: NetConfig,

    /// Version resolution settings
    pub resolver: ResolverConfig,

    /// Sandbox runtime settings
    pub sandbox: SandboxConfig,

    /// Toolchain binary names and location
    pub toolchain: ToolchainConfig,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Maximum concurrent artifact downloads
    pub jobs: Option<usize>,
}

/// Network-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// Library catalog URL (http(s) or file)
    pub catalog_url: Option<String>,

    /// Offline mode (never download artifacts that are not cached)
    pub offline: bool,
}

/// Resolver configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// `prefix` (default) or `semver`
    pub strategy: Option<String>,
}

/// Sandbox configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Image reference used for build sessions
    pub image: Option<String>,

    /// Runtime API endpoint (e.g. `unix:///run/user/1000/podman/podman.sock`)
    pub endpoint: Option<String>,

    /// Runtime client program
    pub program: Option<String>,

    /// Mount point of the build workspace inside the sandbox
    pub workspace_mount: Option<String>,

    /// Mount point of the toolchain binaries inside the sandbox
    pub toolchain_mount: Option<String>,

    /// Commands run once after the session starts
    pub provision: Option<Vec<Vec<String>>>,
}

/// Toolchain configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Host directory holding the toolchain binaries
    pub dir: Option<PathBuf>,
    pub preprocessor: Option<String>,
    pub checker: Option<String>,
    pub codegen: Option<String>,
    pub cc: Option<String>,
    pub cxx: Option<String>,
    pub linker: Option<String>,
    pub diagnostic: Option<String>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }

        if other.net.catalog_url.is_some() {
            self.net.catalog_url = other.net.catalog_url;
        }
        if other.net.offline {
            self.net.offline = true;
        }

        if other.resolver.strategy.is_some() {
            self.resolver.strategy = other.resolver.strategy;
        }

        let sandbox = other.sandbox;
        merge_opt(&mut self.sandbox.image, sandbox.image);
        merge_opt(&mut self.sandbox.endpoint, sandbox.endpoint);
        merge_opt(&mut self.sandbox.program, sandbox.program);
        merge_opt(&mut self.sandbox.workspace_mount, sandbox.workspace_mount);
        merge_opt(&mut self.sandbox.toolchain_mount, sandbox.toolchain_mount);
        merge_opt(&mut self.sandbox.provision, sandbox.provision);

        let toolchain = other.toolchain;
        merge_opt(&mut self.toolchain.dir, toolchain.dir);
        merge_opt(&mut self.toolchain.preprocessor, toolchain.preprocessor);
        merge_opt(&mut self.toolchain.checker, toolchain.checker);
        merge_opt(&mut self.toolchain.codegen, toolchain.codegen);
        merge_opt(&mut self.toolchain.cc, toolchain.cc);
        merge_opt(&mut self.toolchain.cxx, toolchain.cxx);
        merge_opt(&mut self.toolchain.linker, toolchain.linker);
        merge_opt(&mut self.toolchain.diagnostic, toolchain.diagnostic);
    }

    /// Download concurrency.
    pub fn jobs(&self) -> usize {
        self.build.jobs.filter(|j| *j > 0).unwrap_or(DEFAULT_JOBS)
    }

    /// Catalog URL.
    pub fn catalog_url(&self) -> &str {
        self.net.catalog_url.as_deref().unwrap_or(DEFAULT_CATALOG_URL)
    }

    /// Parse the resolver strategy.
    pub fn match_strategy(&self) -> Result<MatchStrategy> {
        match self.resolver.strategy.as_deref() {
            None => Ok(MatchStrategy::default()),
            Some(s) => match s.parse() {
                Ok(strategy) => Ok(strategy),
                Err(e) => bail!("invalid resolver.strategy: {}", e),
            },
        }
    }

    /// Toolchain role names, falling back to the standard binaries.
    pub fn toolchain_roles(&self) -> ToolchainRoles {
        let defaults = ToolchainRoles::default();
        let t = &self.toolchain;
        ToolchainRoles {
            preprocessor: t.preprocessor.clone().unwrap_or(defaults.preprocessor),
            checker: t.checker.clone().unwrap_or(defaults.checker),
            codegen: t.codegen.clone().unwrap_or(defaults.codegen),
            cc: t.cc.clone().unwrap_or(defaults.cc),
            cxx: t.cxx.clone().unwrap_or(defaults.cxx),
            linker: t.linker.clone().unwrap_or(defaults.linker),
            diagnostic: t.diagnostic.clone().unwrap_or(defaults.diagnostic),
        }
    }

    /// Host toolchain directory (config overrides the platform default).
    pub fn toolchain_dir(&self, paths: &Paths) -> PathBuf {
        self.toolchain
            .dir
            .clone()
            .unwrap_or_else(|| paths.toolchain_dir.clone())
    }

    /// Resolved sandbox settings.
    pub fn sandbox_settings(&self) -> SandboxSettings {
        let defaults = SandboxSettings::default();
        let s = &self.sandbox;
        SandboxSettings {
            image: s.image.clone().unwrap_or(defaults.image),
            endpoint: s.endpoint.clone().or(defaults.endpoint),
            program: s.program.clone().unwrap_or(defaults.program),
            workspace_mount: s.workspace_mount.clone().unwrap_or(defaults.workspace_mount),
            toolchain_mount: s.toolchain_mount.clone().unwrap_or(defaults.toolchain_mount),
            provision: s.provision.clone().unwrap_or(defaults.provision),
        }
    }
}

fn merge_opt<T>(slot: &mut Option<T>, other: Option<T>) {
    if other.is_some() {
        *slot = other;
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.virus/config.toml)
/// 2. Global config (~/.virus/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.jobs(), DEFAULT_JOBS);
        assert_eq!(config.catalog_url(), DEFAULT_CATALOG_URL);
        assert_eq!(config.match_strategy().unwrap(), MatchStrategy::Prefix);

        let roles = config.toolchain_roles();
        assert_eq!(roles.preprocessor, "preprocessor");
        assert_eq!(roles.checker, "plsa");
        assert_eq!(roles.linker, "gcc");
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
[build]
jobs = 8

[net]
catalog_url = "file:///srv/virus.json"

[resolver]
strategy = "semver"

[sandbox]
image = "docker.io/library/alpine:3.20"
provision = [["apk", "add", "gcc"]]

[toolchain]
dir = "/opt/vira/bin"
cc = "clang"
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.jobs(), 8);
        assert_eq!(config.catalog_url(), "file:///srv/virus.json");
        assert_eq!(config.match_strategy().unwrap(), MatchStrategy::Semver);
        assert_eq!(config.toolchain_roles().cc, "clang");
        assert_eq!(config.toolchain_roles().cxx, "g++");

        let sandbox = config.sandbox_settings();
        assert_eq!(sandbox.image, "docker.io/library/alpine:3.20");
        assert_eq!(sandbox.provision, vec![vec!["apk", "add", "gcc"]]);
        assert_eq!(sandbox.workspace_mount, "/work");
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.build.jobs = Some(2);
        base.sandbox.image = Some("base-image".to_string());

        let mut project = Config::default();
        project.sandbox.image = Some("project-image".to_string());

        base.merge(project);

        assert_eq!(base.jobs(), 2);
        assert_eq!(base.sandbox_settings().image, "project-image");
    }

    #[test]
    fn test_invalid_strategy() {
        let mut config = Config::default();
        config.resolver.strategy = Some("newest".to_string());
        assert!(config.match_strategy().is_err());
    }

    #[test]
    fn test_load_config_precedence() {
        let tmp = TempDir::new().unwrap();
        let global = tmp.path().join("global.toml");
        let project = tmp.path().join("project.toml");
        std::fs::write(&global, "[build]\njobs = 3\n[net]\noffline = true\n").unwrap();
        std::fs::write(&project, "[build]\njobs = 6\n").unwrap();

        let config = load_config(&global, &project);
        assert_eq!(config.jobs(), 6);
        assert!(config.net.offline);
    }

    #[test]
    fn test_zero_jobs_falls_back() {
        let mut config = Config::default();
        config.build.jobs = Some(0);
        assert_eq!(config.jobs(), DEFAULT_JOBS);
    }
}
