//! `virus build` command

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::cli::BuildArgs;
use crate::GlobalOptions;
use virus::ops::virus_build::{build, BuildError, BuildOptions, BuildServices};
use virus::sandbox::{PodmanRuntime, SandboxError};
use virus::sources::HttpTransport;
use virus::util::diagnostic::{emit, suggestions, Diagnostic};
use virus::util::{fs, CancelToken, GlobalContext, Status};

pub fn execute(args: BuildArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let ctx = GlobalContext::new()?;
    // Fail early with the init hint
    let manifest_path = super::find_manifest(&ctx)?;

    let config = ctx.load_config();
    let runtime = PodmanRuntime::new(&config.sandbox_settings());
    let services = BuildServices {
        runtime: &runtime,
        transport: Arc::new(HttpTransport::new()?),
        shell: Arc::clone(shell),
        cancel: CancelToken::from_signals(),
    };
    let opts = BuildOptions {
        catalog_url: args.catalog,
        jobs: args.jobs,
        offline: args.offline,
    };

    match build(&ctx, &opts, &services) {
        Ok(outcome) => {
            let shown = fs::relative_path(ctx.cwd(), &outcome.binary);
            shell.status(Status::Created, shown.display());
            Ok(())
        }
        Err(err) => match diagnostic_for(&err) {
            Some(diag) => {
                emit(&diag.with_location(&manifest_path), shell.use_color());
                bail!("build failed");
            }
            None => Err(err.into()),
        },
    }
}

/// Actionable diagnostics for errors the user can fix.
fn diagnostic_for(err: &BuildError) -> Option<Diagnostic> {
    match err {
        BuildError::Resolve(e) => Some(e.to_diagnostic()),
        BuildError::Fetch(e) => {
            Some(Diagnostic::error(e.to_string()).with_suggestion(suggestions::FETCH_FAILED))
        }
        BuildError::Sandbox(e @ SandboxError::Unavailable { .. }) => {
            Some(Diagnostic::error(e.to_string()).with_suggestion(suggestions::SANDBOX_UNAVAILABLE))
        }
        _ => None,
    }
}
