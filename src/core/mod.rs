//! Core data structures for Virus.
//!
//! This module contains the foundational types used throughout Virus:
//! - The `Project.toml` manifest
//! - Dependency declarations and version specs
//! - The library catalog

pub mod catalog;
pub mod dependency;
pub mod manifest;

pub use catalog::{Catalog, CatalogVersion, Library};
pub use dependency::{DependencyDecl, VersionSpec};
pub use manifest::{find_manifest, Manifest, ManifestError, PROJECT_MANIFEST};
