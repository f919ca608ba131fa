//! Implementation of `virus install`: resolve one library and pre-fetch it
//! into the artifact store without building anything.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::core::dependency::{DependencyDecl, VersionSpec};
use crate::resolver::{ResolvedDependency, Resolver};
use crate::sources::{fetch_catalog, ArtifactStore, Transport};
use crate::util::context::GlobalContext;
use crate::util::shell::{Shell, Status};

/// Options for the install command.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Library name
    pub name: String,

    /// Version spec; latest when not given
    pub version: Option<String>,

    /// Catalog URL override
    pub catalog_url: Option<String>,
}

/// A library now present in the artifact store.
#[derive(Debug, Clone)]
pub struct Installed {
    pub dependency: ResolvedDependency,
    pub path: PathBuf,
}

/// Resolve and fetch a single library.
pub fn install(
    ctx: &GlobalContext,
    opts: &InstallOptions,
    transport: Arc<dyn Transport>,
    shell: Arc<Shell>,
) -> Result<Installed> {
    let config = ctx.load_config();
    let url = opts
        .catalog_url
        .as_deref()
        .unwrap_or_else(|| config.catalog_url());

    let spec = opts
        .version
        .as_deref()
        .map(VersionSpec::parse)
        .unwrap_or_default();
    let decl = DependencyDecl::new(opts.name.clone(), spec);

    shell.status(Status::Resolving, &decl);
    let catalog = fetch_catalog(transport.as_ref(), url)?;
    let resolver = Resolver::new(config.match_strategy()?);
    let mut resolved = resolver.resolve_all(&catalog, std::slice::from_ref(&decl))?;
    let Some(dependency) = resolved.pop() else {
        anyhow::bail!("failed to resolve `{}`", decl);
    };

    let store = ArtifactStore::new(ctx.artifact_store_dir(), transport, Arc::clone(&shell))
        .with_offline(config.net.offline);
    let path = store.ensure(&dependency.name, &dependency.version, &dependency.url)?;
    shell.status(Status::Installed, &dependency);

    Ok(Installed { dependency, path })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolveError;
    use crate::sources::HttpTransport;
    use crate::test_support::{file_url, CatalogFixture};
    use tempfile::TempDir;

    fn setup() -> (TempDir, String) {
        let mirror = TempDir::new().unwrap();
        for v in ["0.9.0", "1.0.0"] {
            std::fs::write(mirror.path().join(format!("http-{v}.vira")), v).unwrap();
        }
        let catalog = CatalogFixture::new()
            .library("http", &["0.9.0", "1.0.0"], &file_url(mirror.path()))
            .to_json();
        let path = mirror.path().join("virus.json");
        std::fs::write(&path, catalog).unwrap();
        let url = file_url(&path);
        (mirror, url)
    }

    fn run(home: &TempDir, opts: &InstallOptions) -> Result<Installed> {
        let ctx = GlobalContext::with_cwd(home.path().to_path_buf())
            .unwrap()
            .with_home(home.path().to_path_buf());
        install(
            &ctx,
            opts,
            Arc::new(HttpTransport::new().unwrap()),
            Arc::new(Shell::quiet()),
        )
    }

    #[test]
    fn test_install_latest() {
        let (_mirror, url) = setup();
        let home = TempDir::new().unwrap();
        let opts = InstallOptions {
            name: "http".to_string(),
            version: None,
            catalog_url: Some(url),
        };

        let installed = run(&home, &opts).unwrap();
        assert_eq!(installed.dependency.version, "1.0.0");
        assert_eq!(
            installed.path,
            home.path().join("artifacts/http/1.0.0/http-1.0.0.vira")
        );
        assert_eq!(std::fs::read_to_string(&installed.path).unwrap(), "1.0.0");
    }

    #[test]
    fn test_install_exact_version() {
        let (_mirror, url) = setup();
        let home = TempDir::new().unwrap();
        let opts = InstallOptions {
            name: "http".to_string(),
            version: Some("0.9.0".to_string()),
            catalog_url: Some(url),
        };
        assert_eq!(run(&home, &opts).unwrap().dependency.version, "0.9.0");
    }

    #[test]
    fn test_install_unknown_version() {
        let (_mirror, url) = setup();
        let home = TempDir::new().unwrap();
        let opts = InstallOptions {
            name: "http".to_string(),
            version: Some("9.9.9".to_string()),
            catalog_url: Some(url),
        };
        let err = run(&home, &opts).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ResolveError>(),
            Some(ResolveError::NoMatchingVersion { .. })
        ));
    }
}
