//! Podman-backed isolation runtime.
//!
//! Drives the Podman remote API through the `podman --url <endpoint>` client
//! so the daemonless user service can be used without root.

use std::path::PathBuf;

use crate::sandbox::{ExecOutput, IsolationRuntime, SandboxError, SandboxSettings, SessionSpec};
use crate::util::process::{find_executable, MergedOutput, ProcessBuilder};

/// Exit code podman uses for its own failures (as opposed to the command's).
const PODMAN_ERROR: i32 = 125;

/// Seconds to wait before a stop escalates to SIGKILL.
const STOP_TIMEOUT_SECS: &str = "2";

/// Isolation runtime driving the `podman` CLI.
#[derive(Debug, Clone)]
pub struct PodmanRuntime {
    program: PathBuf,
    endpoint: Option<String>,
}

impl PodmanRuntime {
    /// Create a runtime from resolved settings.
    pub fn new(settings: &SandboxSettings) -> Self {
        let program = find_executable(&settings.program)
            .unwrap_or_else(|| PathBuf::from(&settings.program));
        PodmanRuntime {
            program,
            endpoint: settings.endpoint.clone().or_else(default_endpoint),
        }
    }

    /// Runtime API endpoint in use, if any.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    fn command(&self) -> ProcessBuilder {
        let pb = ProcessBuilder::new(&self.program);
        match &self.endpoint {
            Some(url) => pb.args(["--url", url.as_str()]),
            None => pb,
        }
    }

    fn run(&self, pb: ProcessBuilder) -> Result<MergedOutput, SandboxError> {
        tracing::debug!("{}", pb.display_command());
        pb.exec_merged().map_err(|e| SandboxError::Unavailable {
            message: format!("{:#}", e),
        })
    }

    fn check(out: MergedOutput) -> Result<MergedOutput, String> {
        if out.success() {
            Ok(out)
        } else {
            Err(format!(
                "exit code {}: {}",
                out.code.map_or_else(|| "signal".to_string(), |c| c.to_string()),
                out.text().trim()
            ))
        }
    }
}

impl IsolationRuntime for PodmanRuntime {
    fn name(&self) -> &str {
        "podman"
    }

    fn image_exists(&self, image: &str) -> Result<bool, SandboxError> {
        let out = self.run(self.command().args(["image", "exists", image]))?;
        match out.code {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(SandboxError::Unavailable {
                message: out.text().trim().to_string(),
            }),
        }
    }

    fn pull_image(&self, image: &str) -> Result<(), SandboxError> {
        let out = self.run(self.command().args(["pull", "--quiet", image]))?;
        Self::check(out).map(|_| ()).map_err(|message| SandboxError::Image {
            image: image.to_string(),
            message,
        })
    }

    fn create(&self, spec: &SessionSpec) -> Result<String, SandboxError> {
        let mut pb = self.command().arg("create");
        for mount in &spec.mounts {
            let mut volume = format!("{}:{}", mount.host.display(), mount.target);
            if mount.read_only {
                volume.push_str(":ro");
            }
            pb = pb.arg("--volume").arg(volume);
        }
        for (key, value) in &spec.env {
            pb = pb.arg("--env").arg(format!("{}={}", key, value));
        }
        pb = pb
            .args(["--workdir", spec.workdir.as_str()])
            .arg(&spec.image)
            .args(&spec.command);

        tracing::debug!("{}", pb.display_command());
        let output = pb.exec().map_err(|e| SandboxError::Unavailable {
            message: format!("{:#}", e),
        })?;
        if !output.status.success() {
            return Err(SandboxError::Create {
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .last()
            .map(str::to_string)
            .ok_or_else(|| SandboxError::Create {
                message: "runtime returned no session id".to_string(),
            })
    }

    fn start(&self, id: &str) -> Result<(), SandboxError> {
        let out = self.run(self.command().args(["start", id]))?;
        Self::check(out).map(|_| ()).map_err(|message| SandboxError::Start {
            id: id.to_string(),
            message,
        })
    }

    fn exec(&self, id: &str, argv: &[String], workdir: &str) -> Result<ExecOutput, SandboxError> {
        let pb = self
            .command()
            .args(["exec", "--workdir", workdir, id])
            .args(argv);
        let out = self.run(pb)?;

        match out.code {
            Some(PODMAN_ERROR) | None => Err(SandboxError::Exec {
                id: id.to_string(),
                message: out.text().trim().to_string(),
            }),
            Some(exit_code) => Ok(ExecOutput {
                output: out.output,
                exit_code,
            }),
        }
    }

    fn stop(&self, id: &str) -> Result<(), SandboxError> {
        let out = self.run(self.command().args(["stop", "--time", STOP_TIMEOUT_SECS, id]))?;
        Self::check(out).map(|_| ()).map_err(|message| SandboxError::Teardown {
            id: id.to_string(),
            message,
        })
    }

    fn remove(&self, id: &str) -> Result<(), SandboxError> {
        let out = self.run(self.command().args(["rm", "--force", id]))?;
        Self::check(out).map(|_| ()).map_err(|message| SandboxError::Teardown {
            id: id.to_string(),
            message,
        })
    }
}

/// `unix://$XDG_RUNTIME_DIR/podman/podman.sock`, falling back to the
/// per-user runtime directory.
#[cfg(unix)]
pub fn default_endpoint() -> Option<String> {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR")
        .ok()
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| format!("/run/user/{}", nix::unistd::getuid()));
    Some(format!("unix://{}/podman/podman.sock", runtime_dir))
}

/// On non-Unix hosts the podman client finds its machine connection itself.
#[cfg(not(unix))]
pub fn default_endpoint() -> Option<String> {
    None
}
