//! Implementation of `virus init`.

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::core::manifest::{generate_default_manifest, DEFAULT_MAIN_SOURCE, PROJECT_MANIFEST};
use crate::util::fs;

/// Name used when none is given.
pub const DEFAULT_PROJECT_NAME: &str = "myproject";

/// Options for creating a project.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Package name
    pub name: String,
}

impl Default for InitOptions {
    fn default() -> Self {
        InitOptions {
            name: DEFAULT_PROJECT_NAME.to_string(),
        }
    }
}

/// Initialize a Virus project in `path`, creating the directory if needed.
pub fn init_project(path: &Path, opts: &InitOptions) -> Result<()> {
    if opts.name.trim().is_empty() {
        bail!("package name cannot be empty");
    }

    let manifest_path = path.join(PROJECT_MANIFEST);
    if manifest_path.exists() {
        bail!("`{}` already exists in `{}`", PROJECT_MANIFEST, path.display());
    }

    fs::ensure_dir(path)?;
    fs::write_string(&manifest_path, &generate_default_manifest(&opts.name))
        .with_context(|| format!("failed to write {}", PROJECT_MANIFEST))?;

    let main = path.join("src").join("main.vira");
    if !main.exists() {
        fs::write_string(&main, DEFAULT_MAIN_SOURCE)?;
    }

    Ok(())
}
