//! Staged compilation inside a sandbox session.
//!
//! Units run one after another and so do the stages within a unit. The
//! first failing stage stops everything; the cancel token is checked before
//! every exec.

use std::path::PathBuf;

use thiserror::Error;

use crate::builder::unit::{host_path, Stage, StageCommand, StageResult, TranslationUnit};
use crate::builder::ToolchainRoles;
use crate::sandbox::{SandboxError, SandboxSession};
use crate::util::interrupt::CancelToken;

/// A stage that exited non-zero.
#[derive(Debug, Clone)]
pub struct StageFailure {
    /// Sandbox path of the unit's source
    pub unit: String,
    /// Host path of the file the failing stage read
    pub host_input: PathBuf,
    pub result: StageResult,
}

/// Pipeline failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{} failed for {}", .0.result.stage, .0.unit)]
    Stage(Box<StageFailure>),

    #[error("link failed with exit code {exit_code}")]
    Link { exit_code: i32, output: String },

    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    #[error("build interrupted")]
    Interrupted,
}

/// Drives translation units through their stages.
#[derive(Debug, Clone)]
pub struct Pipeline {
    roles: ToolchainRoles,
    include_flags: Vec<String>,
    cancel: CancelToken,
}

impl Pipeline {
    pub fn new(roles: ToolchainRoles, include_flags: Vec<String>, cancel: CancelToken) -> Self {
        Pipeline {
            roles,
            include_flags,
            cancel,
        }
    }

    /// Compile one unit, returning every stage result on success.
    pub fn compile_unit(
        &self,
        session: &mut SandboxSession<'_>,
        unit: &TranslationUnit,
    ) -> Result<Vec<StageResult>, PipelineError> {
        let workdir = session.paths().sandbox_root().to_string();
        let mut results = Vec::new();

        for command in unit.stages(&self.roles, &self.include_flags) {
            let result = self.run_stage(session, &command, &workdir)?;
            if !result.success {
                let host_input = host_path(session.paths(), &command.input);
                return Err(PipelineError::Stage(Box::new(StageFailure {
                    unit: unit.source.clone(),
                    host_input,
                    result,
                })));
            }
            results.push(result);
        }

        Ok(results)
    }

    /// Compile every unit in order.
    pub fn compile_all(
        &self,
        session: &mut SandboxSession<'_>,
        units: &[TranslationUnit],
        mut on_unit: impl FnMut(&TranslationUnit),
    ) -> Result<(), PipelineError> {
        for unit in units {
            on_unit(unit);
            self.compile_unit(session, unit)?;
        }
        Ok(())
    }

    /// Link `objects` into `output` (sandbox paths).
    pub fn link(
        &self,
        session: &mut SandboxSession<'_>,
        objects: &[String],
        output: &str,
    ) -> Result<StageResult, PipelineError> {
        let workdir = session.paths().sandbox_root().to_string();
        let mut argv = vec![self.roles.linker.clone()];
        argv.extend(objects.iter().cloned());
        argv.extend(["-o".to_string(), output.to_string()]);

        let command = StageCommand {
            stage: Stage::Link,
            argv,
            input: output.to_string(),
        };
        let result = self.run_stage(session, &command, &workdir)?;
        if !result.success {
            return Err(PipelineError::Link {
                exit_code: result.exit_code,
                output: result.text(),
            });
        }
        Ok(result)
    }

    fn run_stage(
        &self,
        session: &mut SandboxSession<'_>,
        command: &StageCommand,
        workdir: &str,
    ) -> Result<StageResult, PipelineError> {
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Interrupted);
        }

        tracing::debug!("{}: {}", command.stage, command.argv.join(" "));
        let out = session.exec(&command.argv, workdir)?;

        Ok(StageResult {
            stage: command.stage,
            exit_code: out.exit_code,
            success: out.success(),
            output: out.output,
        })
    }
}
