//! Sandbox session guard.

use std::path::PathBuf;

use crate::sandbox::{
    ExecOutput, IsolationRuntime, SandboxError, SandboxPaths, SandboxSettings, SandboxState,
};

/// A live sandbox session.
///
/// Once the runtime has created the session, stop and remove run exactly
/// once: through [`SandboxSession::teardown`] or, failing that, on drop.
pub struct SandboxSession<'r> {
    runtime: &'r dyn IsolationRuntime,
    id: String,
    state: SandboxState,
    paths: SandboxPaths,
    torn_down: bool,
}

impl<'r> SandboxSession<'r> {
    /// Ensure the image, create the session, and start it.
    pub fn open(
        runtime: &'r dyn IsolationRuntime,
        settings: &SandboxSettings,
        workspace_dir: PathBuf,
        toolchain_dir: PathBuf,
    ) -> Result<Self, SandboxError> {
        if !runtime.image_exists(&settings.image)? {
            tracing::info!("pulling image {}", settings.image);
            runtime.pull_image(&settings.image)?;
        }

        let paths = SandboxPaths::new(workspace_dir.clone(), settings.workspace_mount.clone());
        let spec = settings.session_spec(workspace_dir, toolchain_dir);
        let id = runtime.create(&spec)?;
        tracing::debug!("created sandbox session {} via {}", id, runtime.name());

        let mut session = SandboxSession {
            runtime,
            id,
            state: SandboxState::Created,
            paths,
            torn_down: false,
        };

        // On failure the returned error drops `session`, which tears it down.
        session.runtime.start(&session.id)?;
        session.state = SandboxState::Running;

        Ok(session)
    }

    /// Session id assigned by the runtime.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SandboxState {
        self.state
    }

    /// Path translation for the workspace mount.
    pub fn paths(&self) -> &SandboxPaths {
        &self.paths
    }

    /// Run a command and wait for it.
    pub fn exec(&mut self, argv: &[String], workdir: &str) -> Result<ExecOutput, SandboxError> {
        if self.state != SandboxState::Running {
            return Err(SandboxError::NotRunning { state: self.state });
        }
        tracing::debug!("[{}] {}", self.id, argv.join(" "));
        self.runtime.exec(&self.id, argv, workdir)
    }

    /// Run each provisioning command in order, failing on the first non-zero exit.
    pub fn provision(&mut self, commands: &[Vec<String>]) -> Result<(), SandboxError> {
        let workdir = self.paths.sandbox_root().to_string();
        for argv in commands.iter().filter(|argv| !argv.is_empty()) {
            let result = self.exec(argv, &workdir)?;
            if !result.success() {
                return Err(SandboxError::Provision {
                    command: argv.join(" "),
                    exit_code: result.exit_code,
                    output: result.text(),
                });
            }
        }
        Ok(())
    }

    /// Stop and remove the session.
    pub fn teardown(mut self) -> Result<(), SandboxError> {
        self.release()
    }

    fn release(&mut self) -> Result<(), SandboxError> {
        if self.torn_down {
            return Ok(());
        }
        self.torn_down = true;

        // Remove even if stop fails; report the first error.
        let stopped = self.runtime.stop(&self.id);
        if stopped.is_ok() {
            self.state = SandboxState::Stopped;
        }
        let removed = self.runtime.remove(&self.id);
        if removed.is_ok() {
            self.state = SandboxState::Removed;
        }
        tracing::debug!("tore down sandbox session {}", self.id);

        stopped.and(removed)
    }
}

impl Drop for SandboxSession<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!("{}", e);
        }
    }
}

impl std::fmt::Debug for SandboxSession<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxSession")
            .field("runtime", &self.runtime.name())
            .field("id", &self.id)
            .field("state", &self.state)
            .finish()
    }
}
