//! Remote data sources.
//!
//! The catalog and dependency artifacts are both plain GET downloads. The
//! [`Transport`] trait hides whether they come over HTTP or from a local
//! `file://` mirror; the [`ArtifactStore`] caches artifacts host-wide.

pub mod artifact_store;
pub mod catalog;
pub mod transport;

pub use artifact_store::{ArtifactStore, CachedArtifact};
pub use catalog::fetch_catalog;
pub use transport::{Download, FetchError, HttpTransport, Transport};
