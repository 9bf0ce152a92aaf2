//! Bundle loading
//!
//! A `Runtime` owns the process-wide pieces shared by every bundle: the
//! type domain and the shared-module resolver. Each loaded bundle gets its
//! own script environment whose `require` chain is
//! `[bundle scripts, shared scripts, host types]`. Types a bundle
//! synthesizes are exported to the domain once its entry script succeeds,
//! so later bundles can `require` and derive from them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use moonspeak_engine::{FileResolver, ModuleResolver, ResolverChain, ScriptEnv, TypeResolver};
use moonspeak_sdk::TypeDomain;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{error, info};

use crate::error::LoadError;
use crate::manifest::BundleManifest;

/// Label of the process-wide shared resolver
pub const SHARED_RESOLVER: &str = "shared";

/// A loaded bundle
pub struct Bundle {
    id: String,
    root: PathBuf,
    manifest: BundleManifest,
    env: ScriptEnv,
}

impl Bundle {
    /// Bundle id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name from the manifest, or the id
    pub fn name(&self) -> &str {
        self.manifest.name(&self.id)
    }

    /// Bundle root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Parsed manifest (defaults when the bundle has none)
    pub fn manifest(&self) -> &BundleManifest {
        &self.manifest
    }

    /// The bundle's script environment
    pub fn env(&self) -> &ScriptEnv {
        &self.env
    }

    /// Entry script path
    pub fn entry_path(&self) -> PathBuf {
        self.manifest.entry_path(&self.root)
    }
}

/// Loads bundles into isolated script environments over one type domain
pub struct Runtime {
    domain: Arc<TypeDomain>,
    shared: Arc<FileResolver>,
    bundles: RwLock<FxHashMap<String, Arc<Bundle>>>,
}

impl Runtime {
    /// Create a runtime over `domain`
    pub fn new(domain: Arc<TypeDomain>) -> Self {
        Self {
            domain,
            shared: Arc::new(FileResolver::new(SHARED_RESOLVER)),
            bundles: RwLock::new(FxHashMap::default()),
        }
    }

    /// The type domain bundles resolve host types from
    pub fn domain(&self) -> &Arc<TypeDomain> {
        &self.domain
    }

    /// Resolver over every bundle's shared directory
    pub fn shared_resolver(&self) -> &Arc<FileResolver> {
        &self.shared
    }

    /// Add a shared module root that is not part of any bundle
    pub fn add_shared_root(&self, root: impl AsRef<Path>) {
        self.shared.add_root(root);
    }

    /// Load the bundle at `root` under `bundle_id` and run its entry script
    pub fn load_bundle(&self, bundle_id: &str, root: impl AsRef<Path>) -> Result<(), LoadError> {
        let root = root.as_ref();
        match self.try_load(bundle_id, root) {
            Ok(bundle) => {
                info!(
                    bundle = bundle_id,
                    name = bundle.name(),
                    types = bundle.env().types().type_names().len(),
                    "loaded bundle"
                );
                Ok(())
            }
            Err(err) => {
                error!(bundle = bundle_id, root = %root.display(), "failed to load bundle: {}", err);
                Err(err)
            }
        }
    }

    fn try_load(&self, bundle_id: &str, root: &Path) -> Result<Arc<Bundle>, LoadError> {
        if self.bundles.read().contains_key(bundle_id) {
            return Err(LoadError::DuplicateBundle(bundle_id.to_string()));
        }
        if !root.is_dir() {
            return Err(LoadError::Io {
                path: root.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            });
        }

        let manifest = BundleManifest::load(root)?;
        let entry = manifest.entry_path(root);
        if !entry.is_file() {
            return Err(LoadError::MissingEntry {
                bundle: bundle_id.to_string(),
                path: entry,
            });
        }

        // the bundle sees its own shared modules at once; other bundles
        // only after it has loaded
        let shared_dir = manifest.shared_dir(root);
        let has_shared = shared_dir.is_dir();
        let files = FileResolver::new(format!("bundle:{bundle_id}")).with_root(manifest.script_dir(root));
        if has_shared {
            files.add_root(&shared_dir);
        }
        let resolvers = ResolverChain::new()
            .with(Arc::new(files))
            .with(self.shared.clone() as Arc<dyn ModuleResolver>)
            .with(Arc::new(TypeResolver::new(self.domain.clone())));
        let env = ScriptEnv::new(manifest.env_config(bundle_id), resolvers);

        env.eval_file(&entry)
            .map_err(|err| LoadError::bridge(bundle_id, err))?;

        let bundle = Arc::new(Bundle {
            id: bundle_id.to_string(),
            root: root.to_path_buf(),
            manifest,
            env,
        });

        let mut bundles = self.bundles.write();
        if bundles.contains_key(bundle_id) {
            return Err(LoadError::DuplicateBundle(bundle_id.to_string()));
        }
        if has_shared {
            self.shared.add_root(&shared_dir);
        }
        self.domain.add_catalog(bundle.env().types().catalog().clone());
        bundles.insert(bundle_id.to_string(), bundle.clone());
        Ok(bundle)
    }

    /// Re-run a loaded bundle's entry script in its existing environment.
    ///
    /// The module cache is cleared first, so every module is evaluated
    /// again and `class` calls swap the overrides of existing types.
    pub fn reload_bundle(&self, bundle_id: &str) -> Result<(), LoadError> {
        let bundle = self
            .bundle(bundle_id)
            .ok_or_else(|| LoadError::UnknownBundle(bundle_id.to_string()))?;

        bundle.env().clear_loaded();
        match bundle.env().eval_file(&bundle.entry_path()) {
            Ok(_) => {
                info!(bundle = bundle_id, "reloaded bundle");
                Ok(())
            }
            Err(err) => {
                let err = LoadError::bridge(bundle_id, err);
                error!(bundle = bundle_id, "failed to reload bundle: {}", err);
                Err(err)
            }
        }
    }

    /// A loaded bundle
    pub fn bundle(&self, bundle_id: &str) -> Option<Arc<Bundle>> {
        self.bundles.read().get(bundle_id).cloned()
    }

    /// Ids of every loaded bundle, sorted
    pub fn bundle_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.bundles.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn bundle_root(entry: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("scripts")).unwrap();
        std::fs::write(dir.path().join("scripts").join("main.rhai"), entry).unwrap();
        dir
    }

    #[test]
    fn test_load_minimal_bundle() {
        let runtime = Runtime::new(Arc::new(TypeDomain::new()));
        let root = bundle_root("let x = 1;");
        runtime.load_bundle("mods", root.path()).unwrap();

        let bundle = runtime.bundle("mods").unwrap();
        assert_eq!(bundle.id(), "mods");
        assert_eq!(bundle.name(), "mods");
        assert_eq!(bundle.env().id(), "mods");
        assert_eq!(runtime.bundle_ids(), vec!["mods".to_string()]);
    }

    #[test]
    fn test_missing_entry() {
        let runtime = Runtime::new(Arc::new(TypeDomain::new()));
        let root = TempDir::new().unwrap();
        let err = runtime.load_bundle("empty", root.path()).unwrap_err();
        assert!(matches!(err, LoadError::MissingEntry { .. }));
        assert!(runtime.bundle("empty").is_none());
    }

    #[test]
    fn test_missing_root() {
        let runtime = Runtime::new(Arc::new(TypeDomain::new()));
        let root = TempDir::new().unwrap();
        let err = runtime
            .load_bundle("gone", root.path().join("nowhere"))
            .unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_duplicate_bundle() {
        let runtime = Runtime::new(Arc::new(TypeDomain::new()));
        let root = bundle_root("1");
        runtime.load_bundle("mods", root.path()).unwrap();
        assert!(matches!(
            runtime.load_bundle("mods", root.path()),
            Err(LoadError::DuplicateBundle(id)) if id == "mods"
        ));
    }

    #[test]
    fn test_failing_entry_is_not_registered() {
        let runtime = Runtime::new(Arc::new(TypeDomain::new()));
        let catalogs = runtime.domain().catalogs().len();
        let root = bundle_root("throw \"broken\";");

        let err = runtime.load_bundle("broken", root.path()).unwrap_err();
        assert!(err.to_string().contains("broken"), "{err}");
        assert!(runtime.bundle("broken").is_none());
        assert_eq!(runtime.domain().catalogs().len(), catalogs);
    }

    #[test]
    fn test_failed_bundle_does_not_share_modules() {
        let runtime = Runtime::new(Arc::new(TypeDomain::new()));
        let bad = bundle_root("let seen = require(\"helper\"); throw \"broken\";");
        std::fs::create_dir_all(bad.path().join("scripts").join("shared")).unwrap();
        std::fs::write(bad.path().join("scripts").join("shared").join("helper.rhai"), "1").unwrap();

        assert!(runtime.load_bundle("bad", bad.path()).is_err());
        assert!(runtime.shared_resolver().patterns().is_empty());

        let good = bundle_root(
            "let caught = false; try { require(\"helper\"); } catch (err) { caught = true; } if !caught { throw \"leaked\"; }",
        );
        runtime.load_bundle("good", good.path()).unwrap();
    }

    #[test]
    fn test_shared_root_registered_after_success() {
        let runtime = Runtime::new(Arc::new(TypeDomain::new()));
        let root = bundle_root("require(\"helper\")");
        let shared = root.path().join("scripts").join("shared");
        std::fs::create_dir_all(&shared).unwrap();
        std::fs::write(shared.join("helper.rhai"), "1").unwrap();

        runtime.load_bundle("mods", root.path()).unwrap();
        assert_eq!(runtime.shared_resolver().patterns().len(), 1);
    }

    #[test]
    fn test_reload_unknown_bundle() {
        let runtime = Runtime::new(Arc::new(TypeDomain::new()));
        assert!(matches!(
            runtime.reload_bundle("nope"),
            Err(LoadError::UnknownBundle(_))
        ));
    }
}
