//! `virus init` command

use anyhow::Result;

use crate::cli::InitArgs;
use crate::GlobalOptions;
use virus::ops::virus_init::{init_project, InitOptions, DEFAULT_PROJECT_NAME};
use virus::util::{GlobalContext, Status};

pub fn execute(args: InitArgs, global_opts: &GlobalOptions) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let path = match args.path {
        Some(p) if p.is_absolute() => p,
        Some(p) => ctx.cwd().join(p),
        None => ctx.cwd().to_path_buf(),
    };

    let opts = InitOptions {
        name: args
            .name
            .unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string()),
    };
    init_project(&path, &opts)?;

    global_opts.shell.status(
        Status::Created,
        format!("project `{}` in {}", opts.name, path.display()),
    );
    Ok(())
}
