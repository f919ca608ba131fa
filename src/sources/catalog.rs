//! Library catalog download.

use anyhow::{Context, Result};

use crate::core::catalog::Catalog;
use crate::sources::transport::Transport;

/// Download and parse the catalog at `url`.
pub fn fetch_catalog(transport: &dyn Transport, url: &str) -> Result<Catalog> {
    tracing::debug!("fetching catalog from {}", url);

    let bytes = transport
        .get(url)
        .and_then(|download| download.into_bytes(url))
        .with_context(|| format!("failed to fetch library catalog from {}", url))?;

    let catalog = Catalog::from_json(&bytes).with_context(|| format!("catalog at {}", url))?;
    tracing::debug!("catalog lists {} libraries", catalog.libraries.len());

    Ok(catalog)
}
