//! Virus CLI - package manager and sandboxed build driver for Vira

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use virus::util::interrupt::install_signal_handlers;
use virus::util::Shell;

/// Options shared by every command.
pub struct GlobalOptions {
    pub shell: Arc<Shell>,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("virus=debug")
    } else {
        EnvFilter::new("virus=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = install_signal_handlers() {
        tracing::warn!("failed to install interrupt handlers: {}", e);
    }

    let global = GlobalOptions {
        shell: Arc::new(Shell::from_flags(cli.quiet, cli.verbose, cli.color)),
    };

    match cli.command {
        Commands::Init(args) => commands::init::execute(args, &global),
        Commands::Add(args) => commands::add::execute(args, &global),
        Commands::Remove(args) => commands::remove::execute(args, &global),
        Commands::Build(args) => commands::build::execute(args, &global),
        Commands::Install(args) => commands::install::execute(args, &global),
        Commands::Cache(args) => commands::cache::execute(args, &global),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
