//! Implementation of `virus build`.
//!
//! Manifest, catalog, resolution and artifact fetches all happen on the host
//! before any sandbox work, so a bad dependency never costs a session. Once
//! the workspace exists it is deleted on every exit path, and once the
//! session exists it is torn down on every exit path.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use thiserror::Error;

use crate::builder::unit::include_flags;
use crate::builder::{
    BuildWorkspace, DiagnosticReporter, LocalDependency, Pipeline, PipelineError,
    SourceDiagnostic, Stage, TranslationUnit,
};
use crate::core::manifest::Manifest;
use crate::resolver::{ResolveError, ResolvedDependency, Resolver};
use crate::sandbox::{IsolationRuntime, SandboxError, SandboxSession};
use crate::sources::{fetch_catalog, ArtifactStore, FetchError, Transport};
use crate::util::config::Config;
use crate::util::context::GlobalContext;
use crate::util::fs;
use crate::util::interrupt::CancelToken;
use crate::util::shell::{Shell, Status};

/// Options for the build command.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Catalog URL override
    pub catalog_url: Option<String>,

    /// Maximum concurrent artifact downloads
    pub jobs: Option<usize>,

    /// Never download artifacts that are not already cached
    pub offline: bool,
}

/// Collaborators a build talks to.
pub struct BuildServices<'a> {
    pub runtime: &'a dyn IsolationRuntime,
    pub transport: Arc<dyn Transport>,
    pub shell: Arc<Shell>,
    pub cancel: CancelToken,
}

/// A finished build.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    /// Package that was built
    pub package: String,

    /// Host path of the exported executable
    pub binary: PathBuf,

    /// Dependencies linked in, in link order
    pub dependencies: Vec<ResolvedDependency>,
}

/// Build failures.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    #[error("{stage} failed: {diagnostic}")]
    Stage {
        stage: Stage,
        exit_code: i32,
        diagnostic: SourceDiagnostic,
    },

    #[error("link failed with exit code {exit_code}")]
    Link { exit_code: i32, output: String },

    #[error("build interrupted")]
    Interrupted,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Build the project containing the context's working directory.
pub fn build(
    ctx: &GlobalContext,
    opts: &BuildOptions,
    services: &BuildServices<'_>,
) -> Result<BuildOutcome, BuildError> {
    let manifest_path = ctx.find_manifest().map_err(anyhow::Error::from)?;
    let manifest = Manifest::load(&manifest_path)?;
    let config = ctx.load_config();
    let shell = &services.shell;

    let main_source = manifest.src_dir().join("main.vira");
    if !main_source.is_file() {
        return Err(anyhow!("entry point {} does not exist", main_source.display()).into());
    }

    let span = shell.span(
        Status::Compiling,
        format!("{} v{}", manifest.name(), manifest.package.version),
    );

    let resolved = resolve_dependencies(&manifest, &config, opts, services)?;

    let store = ArtifactStore::new(
        ctx.artifact_store_dir(),
        Arc::clone(&services.transport),
        Arc::clone(shell),
    )
    .with_offline(opts.offline || config.net.offline);
    let jobs = opts.jobs.filter(|j| *j > 0).unwrap_or_else(|| config.jobs());
    let artifacts = store.ensure_all(&resolved, jobs)?;

    let deps: Vec<LocalDependency> = resolved
        .iter()
        .cloned()
        .zip(artifacts)
        .map(|(resolved, artifact)| LocalDependency { resolved, artifact })
        .collect();

    if services.cancel.is_cancelled() {
        return Err(BuildError::Interrupted);
    }

    let workspace = BuildWorkspace::create(&manifest, &deps)?;
    let result = compile_in_sandbox(ctx, &config, &manifest, &workspace, &deps, services);
    if let Err(e) = workspace.close() {
        tracing::warn!("{:#}", e);
    }
    let binary = result?;

    span.finish(format!("`{}`", manifest.name()));

    Ok(BuildOutcome {
        package: manifest.name().to_string(),
        binary,
        dependencies: resolved,
    })
}

fn resolve_dependencies(
    manifest: &Manifest,
    config: &Config,
    opts: &BuildOptions,
    services: &BuildServices<'_>,
) -> Result<Vec<ResolvedDependency>, BuildError> {
    let decls = manifest.dependency_decls();
    if decls.is_empty() {
        return Ok(Vec::new());
    }

    let url = opts
        .catalog_url
        .as_deref()
        .unwrap_or_else(|| config.catalog_url());
    services
        .shell
        .status(Status::Resolving, format!("{} dependencies", decls.len()));

    let catalog = fetch_catalog(services.transport.as_ref(), url)?;
    let resolver = Resolver::new(config.match_strategy()?);
    let resolved = resolver.resolve_all(&catalog, &decls)?;

    for dep in &resolved {
        tracing::info!("resolved {}", dep);
    }
    Ok(resolved)
}

/// Open a session over the workspace, compile, link, and copy the
/// executable out. The session is torn down before returning.
fn compile_in_sandbox(
    ctx: &GlobalContext,
    config: &Config,
    manifest: &Manifest,
    workspace: &BuildWorkspace,
    deps: &[LocalDependency],
    services: &BuildServices<'_>,
) -> Result<PathBuf, BuildError> {
    let settings = config.sandbox_settings();
    let toolchain_dir = config.toolchain_dir(ctx.paths());
    let shell = &services.shell;

    shell.status(Status::Provisioning, &settings.image);
    let mut session = SandboxSession::open(
        services.runtime,
        &settings,
        workspace.root().to_path_buf(),
        toolchain_dir.clone(),
    )?;
    session.provision(&settings.provision)?;

    let roles = config.toolchain_roles();
    let reporter = DiagnosticReporter::new(ctx.paths().tool(&toolchain_dir, &roles.diagnostic));
    let paths = session.paths().clone();
    let pipeline = Pipeline::new(roles, include_flags(deps, &paths), services.cancel.clone());

    let mut units = Vec::new();
    let mut labels = Vec::new();
    for dep in deps {
        match TranslationUnit::for_dependency(dep, &paths) {
            Some(unit) => {
                units.push(unit);
                labels.push(dep.resolved.to_string());
            }
            None => tracing::debug!("{} has no compilable artifact", dep.resolved),
        }
    }
    units.push(TranslationUnit::main(&paths));
    labels.push(format!("{} (main)", manifest.name()));

    let compiled = {
        let mut labels = labels.iter();
        pipeline.compile_all(&mut session, &units, |_| {
            if let Some(label) = labels.next() {
                shell.status(Status::Compiling, label);
            }
        })
    };
    compiled.map_err(|e| pipeline_error(e, &reporter, shell))?;

    shell.status(Status::Linking, workspace.binary_relative());
    let objects: Vec<String> = units.iter().map(|u| u.object.clone()).collect();
    pipeline
        .link(&mut session, &objects, &paths.join(&workspace.binary_relative()))
        .map_err(|e| pipeline_error(e, &reporter, shell))?;

    let dest = manifest
        .manifest_dir
        .join("bin")
        .join(ctx.paths().exe_name(manifest.name()));
    fs::copy_file(&workspace.binary_path(), &dest)
        .with_context(|| format!("failed to export {}", workspace.binary_relative()))?;
    fs::set_executable(&dest)?;

    session.teardown()?;
    Ok(dest)
}

/// Report a pipeline failure to the user and convert it.
fn pipeline_error(err: PipelineError, reporter: &DiagnosticReporter, shell: &Shell) -> BuildError {
    match err {
        PipelineError::Stage(failure) => {
            let raw = failure.result.text();
            let (diagnostic, rendered) = reporter.report(&raw, &failure.host_input);
            print_block(shell, rendered.text());
            BuildError::Stage {
                stage: failure.result.stage,
                exit_code: failure.result.exit_code,
                diagnostic,
            }
        }
        PipelineError::Link { exit_code, output } => {
            print_block(shell, &output);
            BuildError::Link { exit_code, output }
        }
        PipelineError::Sandbox(e) => BuildError::Sandbox(e),
        PipelineError::Interrupted => BuildError::Interrupted,
    }
}

fn print_block(shell: &Shell, text: &str) {
    if text.is_empty() {
        return;
    }
    shell.raw(text);
    if !text.ends_with('\n') {
        shell.raw("\n");
    }
}
