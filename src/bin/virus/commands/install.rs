//! `virus install` command

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::cli::InstallArgs;
use crate::GlobalOptions;
use virus::ops::virus_install::{install, InstallOptions};
use virus::resolver::ResolveError;
use virus::sources::HttpTransport;
use virus::util::diagnostic::emit;
use virus::util::GlobalContext;

pub fn execute(args: InstallArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let ctx = GlobalContext::new()?;

    let opts = InstallOptions {
        name: args.name,
        version: args.version,
        catalog_url: args.catalog,
    };

    match install(&ctx, &opts, Arc::new(HttpTransport::new()?), Arc::clone(shell)) {
        Ok(installed) => {
            tracing::debug!("stored at {}", installed.path.display());
            Ok(())
        }
        Err(err) => {
            if let Some(resolve) = err.downcast_ref::<ResolveError>() {
                emit(&resolve.to_diagnostic(), shell.use_color());
                bail!("could not install `{}`", opts.name);
            }
            Err(err)
        }
    }
}
