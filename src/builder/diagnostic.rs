//! Source diagnostics from failing stage output.
//!
//! Toolchain binaries report failures as free text. The first output line is
//! taken as the message; the position comes from the first
//! [`PositionParser`] in the chain that recognises the output. The host
//! `diagnostic` formatter then renders it, and when the formatter cannot be
//! used the raw stage output is shown instead.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::util::process::ProcessBuilder;

/// A diagnostic pinned to a source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDiagnostic {
    pub source_file: PathBuf,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl fmt::Display for SourceDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}",
            self.source_file.display(),
            self.line,
            self.column,
            self.message
        )
    }
}

/// A position recovered from tool output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub column: u32,
    /// Message supplied alongside the position, if any
    pub message: Option<String>,
}

/// Recovers a position from raw tool output.
pub trait PositionParser: Send + Sync {
    fn name(&self) -> &'static str;

    fn parse(&self, output: &str) -> Option<Position>;
}

/// Structured channel: a line holding `{"line": L, "column": C, "message": M}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredParser;

#[derive(Deserialize)]
struct StructuredPosition {
    line: u32,
    column: u32,
    #[serde(default)]
    message: Option<String>,
}

impl PositionParser for StructuredParser {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn parse(&self, output: &str) -> Option<Position> {
        output
            .lines()
            .map(str::trim)
            .filter(|l| l.starts_with('{'))
            .find_map(|l| serde_json::from_str::<StructuredPosition>(l).ok())
            .map(|p| Position {
                line: p.line,
                column: p.column,
                message: p.message.filter(|m| !m.trim().is_empty()),
            })
    }
}

static LINE_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"line (\d+), column (\d+)").expect("line/column pattern is valid"));

/// Legacy text form: `... line L, column C ...` on the first output line.
///
/// Later lines are notes and never move the diagnostic.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineColumnParser;

impl PositionParser for LineColumnParser {
    fn name(&self) -> &'static str {
        "line-column"
    }

    fn parse(&self, output: &str) -> Option<Position> {
        let first = first_line(output)?;
        let caps = LINE_COLUMN.captures(first)?;
        Some(Position {
            line: caps[1].parse().ok()?,
            column: caps[2].parse().ok()?,
            message: None,
        })
    }
}

/// First non-blank line of tool output, trimmed.
fn first_line(output: &str) -> Option<&str> {
    output.lines().map(str::trim).find(|l| !l.is_empty())
}

/// Parser chain with the structured channel first.
pub fn default_parsers() -> Vec<Box<dyn PositionParser>> {
    vec![Box::new(StructuredParser), Box::new(LineColumnParser)]
}

/// How a diagnostic ended up being shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// Output of the host formatter
    Formatted(String),
    /// Raw stage output
    Raw(String),
}

impl Rendered {
    pub fn text(&self) -> &str {
        match self {
            Rendered::Formatted(s) | Rendered::Raw(s) => s,
        }
    }
}

/// Turns failed stage output into a rendered diagnostic.
pub struct DiagnosticReporter {
    formatter: PathBuf,
    parsers: Vec<Box<dyn PositionParser>>,
}

impl DiagnosticReporter {
    /// Reporter using the formatter binary at `formatter`.
    pub fn new(formatter: impl Into<PathBuf>) -> Self {
        DiagnosticReporter {
            formatter: formatter.into(),
            parsers: default_parsers(),
        }
    }

    /// Replace the parser chain.
    pub fn with_parsers(mut self, parsers: Vec<Box<dyn PositionParser>>) -> Self {
        self.parsers = parsers;
        self
    }

    /// Extract a diagnostic for `source_file` from raw output.
    pub fn diagnose(&self, output: &str, source_file: &Path) -> SourceDiagnostic {
        let position = self.parsers.iter().find_map(|p| {
            let found = p.parse(output);
            if found.is_some() {
                tracing::debug!("position recovered by {} parser", p.name());
            }
            found
        });

        let first_line = first_line(output).unwrap_or("unknown error").to_string();

        let (line, column, message) = match position {
            Some(Position {
                line,
                column,
                message,
            }) => (line, column, message.unwrap_or(first_line)),
            None => (1, 1, first_line),
        };

        SourceDiagnostic {
            source_file: source_file.to_path_buf(),
            line,
            column,
            message,
        }
    }

    /// Render through the host formatter, falling back to `raw_output`.
    ///
    /// The fallback applies when the formatter cannot be spawned, or exits
    /// non-zero without printing anything.
    pub fn render(&self, diag: &SourceDiagnostic, raw_output: &str) -> Rendered {
        let line = diag.line.to_string();
        let column = diag.column.to_string();
        let source = diag.source_file.display().to_string();

        let result = ProcessBuilder::new(&self.formatter)
            .args([
                "--source",
                source.as_str(),
                "--message",
                diag.message.as_str(),
                "--line",
                line.as_str(),
                "--column",
                column.as_str(),
            ])
            .exec_merged();

        match result {
            Ok(out) if out.success() || !out.output.is_empty() => Rendered::Formatted(out.text()),
            Ok(out) => {
                tracing::warn!(
                    "diagnostic formatter exited with {:?} and no output",
                    out.code
                );
                Rendered::Raw(raw_output.to_string())
            }
            Err(e) => {
                tracing::warn!("failed to run diagnostic formatter: {:#}", e);
                Rendered::Raw(raw_output.to_string())
            }
        }
    }

    /// Diagnose and render in one step.
    pub fn report(&self, output: &str, source_file: &Path) -> (SourceDiagnostic, Rendered) {
        let diag = self.diagnose(output, source_file);
        let rendered = self.render(&diag, output);
        (diag, rendered)
    }
}

impl fmt::Debug for DiagnosticReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticReporter")
            .field("formatter", &self.formatter)
            .field(
                "parsers",
                &self.parsers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
