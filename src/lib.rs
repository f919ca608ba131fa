//! Virus - package manager and sandboxed build orchestrator for Vira
//!
//! This crate provides the core library functionality for Virus:
//! dependency resolution against the library catalog, artifact caching,
//! sandbox lifecycle management, and the staged compile pipeline.

pub mod builder;
pub mod core;
pub mod ops;
pub mod resolver;
pub mod sandbox;
pub mod sources;
pub mod util;

/// Test utilities and fakes for Virus unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides a recording isolation runtime and a scripted toolchain so the
/// build pipeline can be exercised without Podman.
#[cfg(test)]
pub mod test_support;

pub use self::core::{
    catalog::Catalog, dependency::DependencyDecl, dependency::VersionSpec, manifest::Manifest,
};

pub use resolver::{ResolvedDependency, Resolver};
pub use util::context::GlobalContext;
