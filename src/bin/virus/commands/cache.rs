//! `virus cache` command
//!
//! Inspect and prune the host-wide artifact store.

use std::sync::Arc;

use anyhow::Result;

use crate::cli::{CacheArgs, CacheCommands, CacheRemoveArgs};
use crate::GlobalOptions;
use virus::sources::{ArtifactStore, HttpTransport};
use virus::util::diagnostic::{emit, Diagnostic};
use virus::util::{GlobalContext, Status};

pub fn execute(args: CacheArgs, global_opts: &GlobalOptions) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let store = ArtifactStore::new(
        ctx.artifact_store_dir(),
        Arc::new(HttpTransport::new()?),
        Arc::clone(&global_opts.shell),
    );

    match args.command {
        CacheCommands::List => list(&store, global_opts.shell.use_color()),
        CacheCommands::Remove(remove_args) => remove(&store, remove_args, global_opts),
        CacheCommands::Path => {
            println!("{}", store.root().display());
            Ok(())
        }
    }
}

fn list(store: &ArtifactStore, color: bool) -> Result<()> {
    let artifacts = store.list()?;
    if artifacts.is_empty() {
        println!("(no cached artifacts)");
        return Ok(());
    }

    for artifact in artifacts {
        let digest = artifact
            .sha256()
            .unwrap_or_else(|_| "unreadable".to_string());
        println!(
            "{} v{}  {} bytes  sha256:{}",
            artifact.name, artifact.version, artifact.size, digest
        );
    }

    emit(
        &Diagnostic::warning("artifact digests are informational only")
            .with_context("downloads are not checked against a published checksum"),
        color,
    );
    Ok(())
}

fn remove(store: &ArtifactStore, args: CacheRemoveArgs, global_opts: &GlobalOptions) -> Result<()> {
    let removed = store.remove(&args.name, args.version.as_deref())?;
    let what = match &args.version {
        Some(v) => format!("{} v{}", args.name, v),
        None => args.name.clone(),
    };

    if removed == 0 {
        global_opts.shell.note(format!("{} is not cached", what));
    } else {
        global_opts
            .shell
            .status(Status::Removed, format!("{} ({} version(s))", what, removed));
    }
    Ok(())
}
