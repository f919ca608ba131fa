//! `virus remove` command

use anyhow::Result;

use crate::cli::RemoveArgs;
use crate::GlobalOptions;
use virus::ops::virus_add::remove_dependency;
use virus::util::{GlobalContext, Status};

pub fn execute(args: RemoveArgs, global_opts: &GlobalOptions) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let manifest_path = super::find_manifest(&ctx)?;

    remove_dependency(&manifest_path, &args.name)?;
    global_opts.shell.status(Status::Removed, &args.name);

    Ok(())
}
