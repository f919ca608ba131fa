//! High-level operations.
//!
//! This module contains the implementation of Virus commands.

pub mod virus_add;
pub mod virus_build;
pub mod virus_init;
pub mod virus_install;

pub use virus_add::{add_dependency, remove_dependency, AddOptions, AddResult};
pub use virus_build::{build, BuildError, BuildOptions, BuildOutcome, BuildServices};
pub use virus_init::{init_project, InitOptions, DEFAULT_PROJECT_NAME};
pub use virus_install::{install, InstallOptions, Installed};
