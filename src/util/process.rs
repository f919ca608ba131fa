//! Subprocess execution utilities.

use std::ffi::OsStr;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use anyhow::{Context, Result};

/// Output of a process whose stdout and stderr were captured into one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedOutput {
    /// Interleaved stdout + stderr bytes.
    pub output: Vec<u8>,
    /// Exit code, or `None` if the process was killed by a signal.
    pub code: Option<i32>,
}

impl MergedOutput {
    /// Check if the process exited with status 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Lossy UTF-8 view of the captured output.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.stdin(Stdio::null());
        cmd
    }

    /// Execute the command and wait for completion, capturing stdout and stderr separately.
    pub fn exec(&self) -> Result<Output> {
        let mut cmd = self.build_command();
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?;

        let output = child
            .wait_with_output()
            .with_context(|| format!("failed to wait for `{}`", self.program.display()))?;

        Ok(output)
    }

    /// Execute with stdout and stderr redirected into the same file, so the
    /// captured bytes keep the order in which the child wrote them.
    pub fn exec_merged(&self) -> Result<MergedOutput> {
        let mut sink = tempfile::tempfile().context("failed to create output capture file")?;
        let stderr_sink = sink
            .try_clone()
            .context("failed to duplicate output capture handle")?;

        let mut cmd = self.build_command();
        cmd.stdout(Stdio::from(
            sink.try_clone()
                .context("failed to duplicate output capture handle")?,
        ));
        cmd.stderr(Stdio::from(stderr_sink));

        let status = cmd
            .status()
            .with_context(|| format!("failed to execute `{}`", self.program.display()))?;

        let mut output = Vec::new();
        sink.seek(SeekFrom::Start(0))?;
        sink.read_to_end(&mut output)
            .context("failed to read captured output")?;

        Ok(MergedOutput {
            output,
            code: status.code(),
        })
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_command() {
        let pb = ProcessBuilder::new("gcc").args(["-c", "main.c", "-o", "main.o"]);

        assert_eq!(pb.display_command(), "gcc -c main.c -o main.o");
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_merged_captures_both_streams() {
        let out = ProcessBuilder::new("sh")
            .args(["-c", "echo out; echo err 1>&2; exit 3"])
            .exec_merged()
            .unwrap();

        assert_eq!(out.code, Some(3));
        assert!(!out.success());
        let text = out.text();
        assert!(text.contains("out"));
        assert!(text.contains("err"));
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_merged_keeps_write_order() {
        let out = ProcessBuilder::new("sh")
            .args(["-c", "echo first; echo second 1>&2; echo third"])
            .exec_merged()
            .unwrap();

        assert!(out.success());
        assert_eq!(out.text(), "first\nsecond\nthird\n");
    }

    #[test]
    fn test_exec_missing_program_is_error() {
        let result = ProcessBuilder::new("definitely-not-a-real-program-virus").exec_merged();
        assert!(result.is_err());
    }
}
