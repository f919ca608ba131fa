//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell as CompletionShell;

use virus::util::shell::ColorChoice;

/// Virus - package manager and sandboxed build driver for Vira
#[derive(Parser)]
#[command(name = "virus")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, default_value = "auto", value_parser = parse_color)]
    pub color: ColorChoice,

    #[command(subcommand)]
    pub command: Commands,
}

fn parse_color(s: &str) -> Result<ColorChoice, String> {
    s.parse()
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a Virus project in a directory
    Init(InitArgs),

    /// Add a dependency to Project.toml
    Add(AddArgs),

    /// Remove a dependency from Project.toml
    Remove(RemoveArgs),

    /// Build the current project inside a sandbox
    #[command(alias = "compile")]
    Build(BuildArgs),

    /// Fetch a library into the artifact store
    Install(InstallArgs),

    /// Inspect or prune the artifact store
    Cache(CacheArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Package name
    #[arg(long)]
    pub name: Option<String>,

    /// Directory to initialize (defaults to current directory)
    pub path: Option<PathBuf>,
}

#[derive(Args)]
pub struct AddArgs {
    /// Library name
    pub name: String,

    /// Version spec: `*`, `^prefix`, or an exact version
    #[arg(long)]
    pub version: Option<String>,
}

#[derive(Args)]
pub struct RemoveArgs {
    /// Library name
    pub name: String,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Catalog URL (http, https, or file)
    #[arg(long)]
    pub catalog: Option<String>,

    /// Maximum concurrent downloads
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Only use artifacts already in the store
    #[arg(long)]
    pub offline: bool,
}

#[derive(Args)]
pub struct InstallArgs {
    /// Library name
    pub name: String,

    /// Version spec (defaults to the latest release)
    pub version: Option<String>,

    /// Catalog URL (http, https, or file)
    #[arg(long)]
    pub catalog: Option<String>,
}

#[derive(Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommands,
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// List cached artifacts
    List,

    /// Remove cached versions of a library
    Remove(CacheRemoveArgs),

    /// Print the artifact store location
    Path,
}

#[derive(Args)]
pub struct CacheRemoveArgs {
    /// Library name
    pub name: String,

    /// Only this version
    #[arg(long)]
    pub version: Option<String>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: CompletionShell,
}
