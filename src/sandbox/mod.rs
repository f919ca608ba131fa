//! Sandbox management.
//!
//! Every toolchain invocation runs inside an ephemeral session created from
//! a container image. The build workspace is bind-mounted read-write and the
//! toolchain directory read-only; the session is always torn down, whether
//! the build succeeds, fails, or is interrupted.

pub mod paths;
pub mod podman;
pub mod session;

pub use paths::SandboxPaths;
pub use podman::PodmanRuntime;
pub use session::SandboxSession;

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Default build image.
pub const DEFAULT_IMAGE: &str = "cgr.dev/chainguard/wolfi-base:latest";

/// Idle process that keeps a session alive between execs.
pub const KEEPALIVE_COMMAND: [&str; 3] = ["/bin/sh", "-c", "while true; do sleep 100000; done"];

/// System PATH entries appended after the toolchain mount.
const SYSTEM_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// Lifecycle of a session. Only `Running` accepts exec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxState {
    Created,
    Running,
    Stopped,
    Removed,
}

impl fmt::Display for SandboxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SandboxState::Created => "created",
            SandboxState::Running => "running",
            SandboxState::Stopped => "stopped",
            SandboxState::Removed => "removed",
        };
        write!(f, "{}", s)
    }
}

/// A bind mount from the host into the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    pub host: PathBuf,
    pub target: String,
    pub read_only: bool,
}

/// Everything the runtime needs to create a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSpec {
    pub image: String,
    pub mounts: Vec<MountSpec>,
    pub env: Vec<(String, String)>,
    pub workdir: String,
    pub command: Vec<String>,
}

/// Result of one exec inside a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    /// stdout and stderr, interleaved
    pub output: Vec<u8>,
    pub exit_code: i32,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Output decoded lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// Sandbox runtime failures. Tool failures inside a running session are not
/// errors at this level; they come back as a non-zero [`ExecOutput`].
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("sandbox runtime unavailable: {message}")]
    Unavailable { message: String },

    #[error("failed to pull image `{image}`: {message}")]
    Image { image: String, message: String },

    #[error("failed to create sandbox session: {message}")]
    Create { message: String },

    #[error("failed to start sandbox session {id}: {message}")]
    Start { id: String, message: String },

    #[error("failed to exec in sandbox session {id}: {message}")]
    Exec { id: String, message: String },

    #[error("sandbox session is {state}, not running")]
    NotRunning { state: SandboxState },

    #[error("provisioning command `{command}` failed with exit code {exit_code}")]
    Provision {
        command: String,
        exit_code: i32,
        output: String,
    },

    #[error("failed to tear down sandbox session {id}: {message}")]
    Teardown { id: String, message: String },
}

/// Contract of an isolation runtime.
///
/// Implementations talk to a container engine; the test suite substitutes a
/// recording fake.
pub trait IsolationRuntime: Send + Sync {
    /// Runtime name for logs.
    fn name(&self) -> &str;

    /// Check whether `image` is present locally.
    fn image_exists(&self, image: &str) -> Result<bool, SandboxError>;

    /// Pull `image`.
    fn pull_image(&self, image: &str) -> Result<(), SandboxError>;

    /// Create a session and return its id.
    fn create(&self, spec: &SessionSpec) -> Result<String, SandboxError>;

    /// Start the session's main process.
    fn start(&self, id: &str) -> Result<(), SandboxError>;

    /// Run `argv` in `workdir` and wait for it, merging stdout and stderr.
    fn exec(&self, id: &str, argv: &[String], workdir: &str) -> Result<ExecOutput, SandboxError>;

    /// Stop the session's processes.
    fn stop(&self, id: &str) -> Result<(), SandboxError>;

    /// Delete the session.
    fn remove(&self, id: &str) -> Result<(), SandboxError>;
}

/// Resolved sandbox configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxSettings {
    /// Image reference
    pub image: String,

    /// Runtime API endpoint; the runtime picks its default when None
    pub endpoint: Option<String>,

    /// Runtime client program
    pub program: String,

    /// Workspace mount point
    pub workspace_mount: String,

    /// Toolchain mount point, prepended to PATH
    pub toolchain_mount: String,

    /// Commands run once after the session starts
    pub provision: Vec<Vec<String>>,
}

impl SandboxSettings {
    /// PATH inside the session.
    pub fn exec_path(&self) -> String {
        format!("{}:{}", self.toolchain_mount, SYSTEM_PATH)
    }

    /// Build the creation spec for a workspace and toolchain directory.
    pub fn session_spec(&self, workspace_dir: PathBuf, toolchain_dir: PathBuf) -> SessionSpec {
        SessionSpec {
            image: self.image.clone(),
            mounts: vec![
                MountSpec {
                    host: workspace_dir,
                    target: self.workspace_mount.clone(),
                    read_only: false,
                },
                MountSpec {
                    host: toolchain_dir,
                    target: self.toolchain_mount.clone(),
                    read_only: true,
                },
            ],
            env: vec![("PATH".to_string(), self.exec_path())],
            workdir: self.workspace_mount.clone(),
            command: KEEPALIVE_COMMAND.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for SandboxSettings {
    fn default() -> Self {
        let argv = |args: &[&str]| args.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        SandboxSettings {
            image: DEFAULT_IMAGE.to_string(),
            endpoint: None,
            program: "podman".to_string(),
            workspace_mount: "/work".to_string(),
            toolchain_mount: "/vira-bin".to_string(),
            provision: vec![
                argv(&["apk", "update"]),
                argv(&["apk", "add", "--no-cache", "build-base", "gcc", "g++"]),
            ],
        }
    }
}
