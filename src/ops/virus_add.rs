//! Implementation of `virus add` and `virus remove`.
//!
//! Edits go through `toml_edit` so comments and layout in `Project.toml`
//! survive.

use std::path::Path;

use anyhow::{bail, Context, Result};
use toml_edit::{value, DocumentMut, Item, Table};

use crate::core::dependency::VersionSpec;
use crate::util::fs;

/// Options for adding a dependency.
#[derive(Debug, Clone)]
pub struct AddOptions {
    /// Library name
    pub name: String,

    /// Version spec; `*` when not given
    pub version: Option<String>,
}

/// What `add_dependency` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddResult {
    Added { spec: String },
    Updated { old: String, spec: String },
    Unchanged { spec: String },
}

/// Add or update a dependency declaration.
pub fn add_dependency(manifest_path: &Path, opts: &AddOptions) -> Result<AddResult> {
    if opts.name.trim().is_empty() {
        bail!("library name cannot be empty");
    }

    let requested = opts
        .version
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or("*");
    let spec = VersionSpec::parse(requested).to_string();
    let mut doc = load_document(manifest_path)?;

    if !doc.contains_key("dependencies") {
        doc["dependencies"] = Item::Table(Table::new());
    }
    let Some(deps) = doc["dependencies"].as_table_like_mut() else {
        bail!("`dependencies` in {} is not a table", manifest_path.display());
    };

    let old = deps
        .get(&opts.name)
        .and_then(|item| item.as_str())
        .map(str::to_string);
    let result = match old {
        Some(old) if old == spec => return Ok(AddResult::Unchanged { spec }),
        Some(old) => AddResult::Updated {
            old,
            spec: spec.clone(),
        },
        None => AddResult::Added { spec: spec.clone() },
    };

    deps.insert(&opts.name, value(spec));
    fs::write_string(manifest_path, &doc.to_string())?;

    Ok(result)
}

/// Remove a dependency declaration.
pub fn remove_dependency(manifest_path: &Path, name: &str) -> Result<()> {
    let mut doc = load_document(manifest_path)?;

    let removed = doc
        .get_mut("dependencies")
        .and_then(Item::as_table_like_mut)
        .and_then(|deps| deps.remove(name));
    if removed.is_none() {
        bail!("dependency `{}` not found in {}", name, manifest_path.display());
    }

    fs::write_string(manifest_path, &doc.to_string())?;
    Ok(())
}

fn load_document(manifest_path: &Path) -> Result<DocumentMut> {
    let content = fs::read_to_string(manifest_path)?;
    content
        .parse()
        .with_context(|| format!("failed to parse {}", manifest_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::manifest::Manifest;
    use tempfile::TempDir;

    fn create_test_manifest(dir: &Path) -> std::path::PathBuf {
        let manifest_path = dir.join("Project.toml");
        std::fs::write(
            &manifest_path,
            "# my project\n[package]\nname = \"test\"\nversion = \"0.1.0\"\n",
        )
        .unwrap();
        manifest_path
    }

    fn add(path: &Path, name: &str, version: Option<&str>) -> AddResult {
        let opts = AddOptions {
            name: name.to_string(),
            version: version.map(str::to_string),
        };
        add_dependency(path, &opts).unwrap()
    }

    #[test]
    fn test_add_defaults_to_latest() {
        let tmp = TempDir::new().unwrap();
        let path = create_test_manifest(tmp.path());

        assert_eq!(add(&path, "json", None), AddResult::Added { spec: "*".into() });

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# my project\n"));
        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.dependencies.get("json").map(String::as_str), Some("*"));
    }

    #[test]
    fn test_add_updates_existing() {
        let tmp = TempDir::new().unwrap();
        let path = create_test_manifest(tmp.path());

        add(&path, "json", Some("^1."));
        assert_eq!(
            add(&path, "json", Some("^1.")),
            AddResult::Unchanged { spec: "^1.".into() }
        );
        assert_eq!(
            add(&path, "json", Some("2.0.0")),
            AddResult::Updated {
                old: "^1.".into(),
                spec: "2.0.0".into()
            }
        );
    }

    #[test]
    fn test_remove_dependency() {
        let tmp = TempDir::new().unwrap();
        let path = create_test_manifest(tmp.path());
        add(&path, "json", None);
        add(&path, "http", None);

        remove_dependency(&path, "json").unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert!(!manifest.dependencies.contains_key("json"));
        assert!(manifest.dependencies.contains_key("http"));
    }

    #[test]
    fn test_remove_missing_dependency() {
        let tmp = TempDir::new().unwrap();
        let path = create_test_manifest(tmp.path());
        let err = remove_dependency(&path, "json").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
