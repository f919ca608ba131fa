//! Command implementations

pub mod add;
pub mod build;
pub mod cache;
pub mod completions;
pub mod init;
pub mod install;
pub mod remove;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use virus::util::diagnostic::suggestions;
use virus::util::GlobalContext;

/// Locate `Project.toml`, pointing at `virus init` when there is none.
pub fn find_manifest(ctx: &GlobalContext) -> Result<PathBuf> {
    ctx.find_manifest()
        .map_err(|e| anyhow!("{}\n\n{}", e, suggestions::NO_MANIFEST))
}
