//! Translation units and their stages.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::builder::workspace::LocalDependency;
use crate::builder::ToolchainRoles;
use crate::sandbox::SandboxPaths;

/// Source language of a unit, from its file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Vira,
    C,
    Cxx,
}

impl UnitKind {
    /// Classify a file. Headers and unknown files are not compiled.
    pub fn from_path(path: &str) -> Option<Self> {
        let ext = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "vira" => Some(UnitKind::Vira),
            "c" => Some(UnitKind::C),
            "cpp" | "cc" | "cxx" => Some(UnitKind::Cxx),
            _ => None,
        }
    }
}

/// One external-tool invocation in a unit's pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Preprocess,
    Check,
    Codegen,
    Compile,
    Link,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Preprocess => "preprocess",
            Stage::Check => "check",
            Stage::Codegen => "codegen",
            Stage::Compile => "compile",
            Stage::Link => "link",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResult {
    pub stage: Stage,
    pub exit_code: i32,
    /// stdout and stderr, interleaved
    pub output: Vec<u8>,
    pub success: bool,
}

impl StageResult {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// A planned stage invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageCommand {
    pub stage: Stage,
    pub argv: Vec<String>,
    /// Sandbox path of the file this stage reads
    pub input: String,
}

/// One source file compiled to one object file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationUnit {
    pub kind: UnitKind,
    /// Sandbox path of the source
    pub source: String,
    /// Sandbox path of the object
    pub object: String,
}

impl TranslationUnit {
    /// The unit for a dependency artifact, or None when it is not compilable.
    ///
    /// Objects land next to the artifact as `lib.o`.
    pub fn for_dependency(dep: &LocalDependency, paths: &SandboxPaths) -> Option<Self> {
        let dir = dep.relative_dir();
        let source = paths.join(&format!("{}/{}", dir, dep.file_name()));
        let kind = UnitKind::from_path(&source)?;
        Some(TranslationUnit {
            kind,
            source,
            object: paths.join(&format!("{}/lib.o", dir)),
        })
    }

    /// The project's entry point `src/main.vira`, compiled to `main.o`.
    pub fn main(paths: &SandboxPaths) -> Self {
        TranslationUnit {
            kind: UnitKind::Vira,
            source: paths.join("src/main.vira"),
            object: paths.join("main.o"),
        }
    }

    /// Sandbox path of the preprocessed Vira source.
    pub fn preprocessed(&self) -> String {
        format!("{}.pre", self.source)
    }

    /// Stage commands in execution order.
    pub fn stages(&self, roles: &ToolchainRoles, include_flags: &[String]) -> Vec<StageCommand> {
        match self.kind {
            UnitKind::Vira => {
                let pre = self.preprocessed();
                let mut preprocess = vec![roles.preprocessor.clone()];
                preprocess.extend(include_flags.iter().cloned());
                preprocess.push(self.source.clone());
                preprocess.push(pre.clone());

                vec![
                    StageCommand {
                        stage: Stage::Preprocess,
                        argv: preprocess,
                        input: self.source.clone(),
                    },
                    StageCommand {
                        stage: Stage::Check,
                        argv: vec![roles.checker.clone(), pre.clone()],
                        input: pre.clone(),
                    },
                    StageCommand {
                        stage: Stage::Codegen,
                        argv: vec![roles.codegen.clone(), pre.clone(), self.object.clone()],
                        input: pre,
                    },
                ]
            }
            UnitKind::C | UnitKind::Cxx => {
                let driver = if self.kind == UnitKind::C {
                    &roles.cc
                } else {
                    &roles.cxx
                };
                let mut argv = vec![driver.clone(), "-c".to_string()];
                argv.extend(include_flags.iter().cloned());
                argv.extend([
                    self.source.clone(),
                    "-o".to_string(),
                    self.object.clone(),
                ]);
                vec![StageCommand {
                    stage: Stage::Compile,
                    argv,
                    input: self.source.clone(),
                }]
            }
        }
    }
}

/// `-I<dir>` for every dependency directory, in dependency order.
pub fn include_flags(deps: &[LocalDependency], paths: &SandboxPaths) -> Vec<String> {
    deps.iter()
        .map(|dep| format!("-I{}", paths.join(&dep.relative_dir())))
        .collect()
}

/// Host path of a sandbox file, falling back to the sandbox path itself.
pub fn host_path(paths: &SandboxPaths, sandbox: &str) -> PathBuf {
    paths
        .to_host(sandbox)
        .unwrap_or_else(|| PathBuf::from(sandbox))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolvedDependency;

    fn paths() -> SandboxPaths {
        SandboxPaths::new("/tmp/ws", "/work")
    }

    fn dep(name: &str, file: &str) -> LocalDependency {
        LocalDependency {
            resolved: ResolvedDependency {
                name: name.to_string(),
                version: "1.0.0".to_string(),
                url: format!("https://example.com/{}", file),
            },
            artifact: PathBuf::from("/cache").join(file),
        }
    }

    #[test]
    fn test_unit_kind() {
        assert_eq!(UnitKind::from_path("/work/a.vira"), Some(UnitKind::Vira));
        assert_eq!(UnitKind::from_path("/work/a.c"), Some(UnitKind::C));
        assert_eq!(UnitKind::from_path("/work/a.cc"), Some(UnitKind::Cxx));
        assert_eq!(UnitKind::from_path("/work/a.h"), None);
        assert_eq!(UnitKind::from_path("/work/Makefile"), None);
    }

    #[test]
    fn test_unit_kind_ignores_extension_case() {
        assert_eq!(UnitKind::from_path("/work/json.VIRA"), Some(UnitKind::Vira));
        assert_eq!(UnitKind::from_path("/work/LIB.C"), Some(UnitKind::C));
        assert_eq!(UnitKind::from_path("/work/fmt.Cpp"), Some(UnitKind::Cxx));
        assert_eq!(UnitKind::from_path("/work/API.H"), None);

        let unit = TranslationUnit::for_dependency(&dep("zlib", "LIB.C"), &paths()).unwrap();
        assert_eq!(unit.kind, UnitKind::C);
        assert_eq!(unit.source, "/work/.virus_deps/zlib/1.0.0/LIB.C");
    }

    #[test]
    fn test_vira_stages() {
        let roles = ToolchainRoles::default();
        let unit = TranslationUnit::main(&paths());
        let flags = vec!["-I/work/.virus_deps/json/1.0.0".to_string()];
        let stages = unit.stages(&roles, &flags);

        assert_eq!(stages.len(), 3);
        assert_eq!(
            stages[0].argv,
            vec![
                "preprocessor",
                "-I/work/.virus_deps/json/1.0.0",
                "/work/src/main.vira",
                "/work/src/main.vira.pre"
            ]
        );
        assert_eq!(stages[0].input, "/work/src/main.vira");
        assert_eq!(stages[1].argv, vec!["plsa", "/work/src/main.vira.pre"]);
        assert_eq!(stages[1].input, "/work/src/main.vira.pre");
        assert_eq!(
            stages[2].argv,
            vec!["compiler", "/work/src/main.vira.pre", "/work/main.o"]
        );
    }

    #[test]
    fn test_c_and_cxx_stages() {
        let roles = ToolchainRoles::default();
        let p = paths();

        let c = TranslationUnit::for_dependency(&dep("zlib", "zlib.c"), &p).unwrap();
        let stages = c.stages(&roles, &["-I/work/x".to_string()]);
        assert_eq!(stages.len(), 1);
        assert_eq!(
            stages[0].argv,
            vec![
                "gcc",
                "-c",
                "-I/work/x",
                "/work/.virus_deps/zlib/1.0.0/zlib.c",
                "-o",
                "/work/.virus_deps/zlib/1.0.0/lib.o"
            ]
        );

        let cxx = TranslationUnit::for_dependency(&dep("fmt", "fmt.cpp"), &p).unwrap();
        assert_eq!(cxx.stages(&roles, &[])[0].argv[0], "g++");
    }

    #[test]
    fn test_header_dependency_is_not_a_unit() {
        let p = paths();
        let header = dep("api", "api.h");
        assert!(TranslationUnit::for_dependency(&header, &p).is_none());
        assert_eq!(
            include_flags(&[header], &p),
            vec!["-I/work/.virus_deps/api/1.0.0".to_string()]
        );
    }

    #[test]
    fn test_host_path() {
        let p = paths();
        assert_eq!(
            host_path(&p, "/work/src/main.vira.pre"),
            PathBuf::from("/tmp/ws/src/main.vira.pre")
        );
        assert_eq!(host_path(&p, "/elsewhere"), PathBuf::from("/elsewhere"));
    }
}
