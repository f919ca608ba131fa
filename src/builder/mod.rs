//! Sandboxed Vira build pipeline.
//!
//! This module stages the build workspace, turns sources into translation
//! units, drives their stages inside a sandbox session, and turns failing
//! stage output into source diagnostics.

pub mod diagnostic;
pub mod pipeline;
pub mod unit;
pub mod workspace;

pub use diagnostic::{DiagnosticReporter, PositionParser, Rendered, SourceDiagnostic};
pub use pipeline::{Pipeline, PipelineError, StageFailure};
pub use unit::{Stage, StageCommand, StageResult, TranslationUnit, UnitKind};
pub use workspace::{BuildWorkspace, LocalDependency, DEPS_DIR};

/// Binary names for each toolchain role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainRoles {
    /// Vira preprocessor: `preprocessor <-I..> in out`
    pub preprocessor: String,
    /// Vira static checker: `plsa in`
    pub checker: String,
    /// Vira code generator: `compiler in out`
    pub codegen: String,
    /// C compiler
    pub cc: String,
    /// C++ compiler
    pub cxx: String,
    /// Linker driver
    pub linker: String,
    /// Host-side diagnostic formatter
    pub diagnostic: String,
}

impl Default for ToolchainRoles {
    fn default() -> Self {
        ToolchainRoles {
            preprocessor: "preprocessor".to_string(),
            checker: "plsa".to_string(),
            codegen: "compiler".to_string(),
            cc: "gcc".to_string(),
            cxx: "g++".to_string(),
            linker: "gcc".to_string(),
            diagnostic: "diagnostic".to_string(),
        }
    }
}
