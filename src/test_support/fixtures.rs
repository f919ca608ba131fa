//! Test fixtures for projects and catalogs.

use std::path::Path;

use crate::core::manifest::{Manifest, PROJECT_MANIFEST};

/// Write a project with `src/main.vira` into `dir` and load its manifest.
pub fn write_project(dir: &Path, name: &str, deps: &[(&str, &str)]) -> Manifest {
    let mut manifest = format!("[package]\nname = \"{name}\"\nversion = \"0.1.0\"\n");
    if !deps.is_empty() {
        manifest.push_str("\n[dependencies]\n");
        for (dep, spec) in deps {
            manifest.push_str(&format!("{dep} = \"{spec}\"\n"));
        }
    }

    std::fs::create_dir_all(dir.join("src")).unwrap();
    std::fs::write(dir.join(PROJECT_MANIFEST), manifest).unwrap();
    std::fs::write(
        dir.join("src").join("main.vira"),
        "int main() {\n\treturn 0;\n}\n",
    )
    .unwrap();

    Manifest::load(&dir.join(PROJECT_MANIFEST)).unwrap()
}

/// Builder for catalog documents.
#[derive(Debug, Default, Clone)]
pub struct CatalogFixture {
    libraries: Vec<(String, Vec<(String, String)>)>,
}

impl CatalogFixture {
    pub fn new() -> Self {
        CatalogFixture::default()
    }

    /// Add a library whose versions are served from `base_url/<name>-<version>.vira`.
    pub fn library(mut self, name: &str, versions: &[&str], base_url: &str) -> Self {
        let versions = versions
            .iter()
            .map(|v| {
                (
                    v.to_string(),
                    format!("{}/{}-{}.vira", base_url.trim_end_matches('/'), name, v),
                )
            })
            .collect();
        self.libraries.push((name.to_string(), versions));
        self
    }

    /// Render as catalog JSON.
    pub fn to_json(&self) -> String {
        let libraries: Vec<serde_json::Value> = self
            .libraries
            .iter()
            .map(|(name, versions)| {
                serde_json::json!({
                    "name": name,
                    "versions": versions
                        .iter()
                        .map(|(v, url)| serde_json::json!({ "version": v, "url": url }))
                        .collect::<Vec<_>>(),
                })
            })
            .collect();
        serde_json::json!({ "libraries": libraries }).to_string()
    }
}

/// Render a `file://` URL for a host path.
pub fn file_url(path: &Path) -> String {
    url::Url::from_file_path(path)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| format!("file://{}", path.display()))
}
