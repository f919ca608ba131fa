//! `virus add` command

use anyhow::Result;

use crate::cli::AddArgs;
use crate::GlobalOptions;
use virus::ops::virus_add::{add_dependency, AddOptions, AddResult};
use virus::util::{GlobalContext, Status};

pub fn execute(args: AddArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let ctx = GlobalContext::new()?;
    let manifest_path = super::find_manifest(&ctx)?;

    let opts = AddOptions {
        name: args.name.clone(),
        version: args.version,
    };

    match add_dependency(&manifest_path, &opts)? {
        AddResult::Added { spec } => {
            shell.status(Status::Added, format!("{} = \"{}\"", args.name, spec));
        }
        AddResult::Updated { old, spec } => {
            shell.status(
                Status::Added,
                format!("{} = \"{}\" (was \"{}\")", args.name, spec, old),
            );
        }
        AddResult::Unchanged { spec } => {
            shell.note(format!("{} = \"{}\" is already declared", args.name, spec));
        }
    }

    Ok(())
}
