//! Test utilities and fakes for Virus unit tests.
//!
//! [`FakeRuntime`] stands in for Podman: it records every call, counts
//! teardown operations, and acts as a scripted toolchain. Successful stage
//! commands write their output file into the mounted workspace on the host,
//! so later stages and the final copy-out see real files.
//!
//! # Example
//!
//! ```rust,ignore
//! let runtime = FakeRuntime::new().with_failure("plsa", 1, "line 2, column 4");
//! let session = SandboxSession::open(&runtime, &settings, ws, toolchain)?;
//! // ...
//! assert_eq!(runtime.remove_count(), 1);
//! ```

pub mod fixtures;

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use crate::sandbox::{ExecOutput, IsolationRuntime, SandboxError, SessionSpec};

pub use fixtures::*;

/// A call observed by [`FakeRuntime`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCall {
    ImageExists(String),
    Pull(String),
    Create(SessionSpec),
    Start(String),
    Exec { argv: Vec<String>, workdir: String },
    Stop(String),
    Remove(String),
}

/// Scripted result for execs of one program.
#[derive(Debug, Clone)]
struct ExecScript {
    program: String,
    exit_code: i32,
    output: String,
}

#[derive(Debug, Default)]
struct FakeState {
    calls: Vec<RuntimeCall>,
    /// Host directory mounted read-write by the last create
    workspace: Option<(PathBuf, String)>,
    next_id: usize,
}

/// Recording isolation runtime with a scripted toolchain.
#[derive(Debug, Default)]
pub struct FakeRuntime {
    state: Mutex<FakeState>,
    image_present: bool,
    fail_create: bool,
    fail_start: bool,
    scripts: Vec<ExecScript>,
}

impl FakeRuntime {
    /// A runtime where the image is missing and every command succeeds.
    pub fn new() -> Self {
        FakeRuntime::default()
    }

    /// Report the image as already present.
    pub fn with_image_present(mut self) -> Self {
        self.image_present = true;
        self
    }

    /// Fail session creation.
    pub fn fail_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    /// Fail session start.
    pub fn fail_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Make every exec of `program` exit with `exit_code` and no output.
    pub fn with_exit_code(self, program: &str, exit_code: i32) -> Self {
        self.with_failure(program, exit_code, "")
    }

    /// Make every exec of `program` exit with `exit_code` printing `output`.
    pub fn with_failure(mut self, program: &str, exit_code: i32, output: &str) -> Self {
        self.scripts.push(ExecScript {
            program: program.to_string(),
            exit_code,
            output: output.to_string(),
        });
        self
    }

    /// Every call so far.
    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.lock().calls.clone()
    }

    /// Number of stop calls.
    pub fn stop_count(&self) -> usize {
        self.count(|c| matches!(c, RuntimeCall::Stop(_)))
    }

    /// Number of remove calls.
    pub fn remove_count(&self) -> usize {
        self.count(|c| matches!(c, RuntimeCall::Remove(_)))
    }

    /// Number of create calls.
    pub fn create_count(&self) -> usize {
        self.count(|c| matches!(c, RuntimeCall::Create(_)))
    }

    /// argv of every exec, in order.
    pub fn exec_argvs(&self) -> Vec<Vec<String>> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                RuntimeCall::Exec { argv, .. } => Some(argv.clone()),
                _ => None,
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&RuntimeCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| pred(c)).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: RuntimeCall) {
        self.lock().calls.push(call);
    }

    /// Write the file a successful stage would have produced.
    fn produce_output(&self, argv: &[String]) {
        let Some((host_root, mount)) = self.lock().workspace.clone() else {
            return;
        };
        if !host_root.is_dir() {
            return;
        }

        let target = match argv.iter().position(|a| a == "-o") {
            Some(i) => argv.get(i + 1),
            // `preprocessor .. in out` and `compiler in out`
            None if argv.len() >= 3 => argv.last(),
            None => None,
        };
        let Some(target) = target else {
            return;
        };
        let Some(rel) = target.strip_prefix(mount.as_str()) else {
            return;
        };

        let host = host_root.join(rel.trim_start_matches('/'));
        if let Some(parent) = host.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = std::fs::write(&host, format!("produced by {}\n", argv.join(" ")));
    }
}

impl IsolationRuntime for FakeRuntime {
    fn name(&self) -> &str {
        "fake"
    }

    fn image_exists(&self, image: &str) -> Result<bool, SandboxError> {
        self.record(RuntimeCall::ImageExists(image.to_string()));
        Ok(self.image_present)
    }

    fn pull_image(&self, image: &str) -> Result<(), SandboxError> {
        self.record(RuntimeCall::Pull(image.to_string()));
        Ok(())
    }

    fn create(&self, spec: &SessionSpec) -> Result<String, SandboxError> {
        self.record(RuntimeCall::Create(spec.clone()));
        if self.fail_create {
            return Err(SandboxError::Create {
                message: "scripted create failure".to_string(),
            });
        }

        let mut state = self.lock();
        state.next_id += 1;
        state.workspace = spec
            .mounts
            .iter()
            .find(|m| !m.read_only)
            .map(|m| (m.host.clone(), m.target.clone()));
        Ok(format!("fake-{}", state.next_id))
    }

    fn start(&self, id: &str) -> Result<(), SandboxError> {
        self.record(RuntimeCall::Start(id.to_string()));
        if self.fail_start {
            return Err(SandboxError::Start {
                id: id.to_string(),
                message: "scripted start failure".to_string(),
            });
        }
        Ok(())
    }

    fn exec(&self, _id: &str, argv: &[String], workdir: &str) -> Result<ExecOutput, SandboxError> {
        self.record(RuntimeCall::Exec {
            argv: argv.to_vec(),
            workdir: workdir.to_string(),
        });

        let program = argv.first().map(String::as_str).unwrap_or_default();
        if let Some(script) = self.scripts.iter().find(|s| s.program == program) {
            return Ok(ExecOutput {
                output: script.output.clone().into_bytes(),
                exit_code: script.exit_code,
            });
        }

        self.produce_output(argv);
        Ok(ExecOutput {
            output: Vec::new(),
            exit_code: 0,
        })
    }

    fn stop(&self, id: &str) -> Result<(), SandboxError> {
        self.record(RuntimeCall::Stop(id.to_string()));
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<(), SandboxError> {
        self.record(RuntimeCall::Remove(id.to_string()));
        Ok(())
    }
}

