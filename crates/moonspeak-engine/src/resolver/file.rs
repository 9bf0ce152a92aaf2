//! File-backed module resolver
//!
//! Search patterns use `?` as the placeholder for the module path, with
//! dots in the module name mapped to path separators: module `ai.brain`
//! against `scripts/?.rhai` looks for `scripts/ai/brain.rhai`.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::error::BridgeError;
use crate::globals::ScriptGlobals;

use super::{ModuleResolver, ModuleSource};

/// Default script file extension
pub const SCRIPT_EXTENSION: &str = "rhai";

/// Resolver over a growable list of search patterns
pub struct FileResolver {
    label: String,
    patterns: RwLock<Vec<String>>,
}

impl FileResolver {
    /// Resolver with no search patterns
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            patterns: RwLock::new(Vec::new()),
        }
    }

    /// Builder-style `add_root`
    pub fn with_root(self, root: impl AsRef<Path>) -> Self {
        self.add_root(root);
        self
    }

    /// Search `<root>/?.rhai`
    pub fn add_root(&self, root: impl AsRef<Path>) {
        let pattern = root.as_ref().join(format!("?.{SCRIPT_EXTENSION}"));
        self.add_pattern(pattern.to_string_lossy());
    }

    /// Add a raw search pattern; duplicates are ignored
    pub fn add_pattern(&self, pattern: impl Into<String>) {
        let pattern = pattern.into();
        let mut patterns = self.patterns.write();
        if !patterns.contains(&pattern) {
            patterns.push(pattern);
        }
    }

    /// Current search patterns, in order
    pub fn patterns(&self) -> Vec<String> {
        self.patterns.read().clone()
    }

    /// Candidate paths for `module`, in search order
    pub fn candidates(&self, module: &str) -> Vec<PathBuf> {
        let Some(relative) = module_path(module) else {
            return Vec::new();
        };
        self.patterns
            .read()
            .iter()
            .map(|pattern| PathBuf::from(pattern.replace('?', &relative)))
            .collect()
    }
}

/// Relative path for a dotted module name, or `None` if the name could
/// escape the search root
fn module_path(module: &str) -> Option<String> {
    let module = module
        .strip_suffix(&format!(".{SCRIPT_EXTENSION}"))
        .unwrap_or(module);
    let segments: Vec<&str> = module.split('.').collect();
    let valid = segments.iter().all(|segment| {
        !segment.is_empty() && !segment.contains(['/', '\\', '?']) && *segment != "~"
    });
    valid.then(|| segments.join(std::path::MAIN_SEPARATOR_STR))
}

impl ModuleResolver for FileResolver {
    fn label(&self) -> &str {
        &self.label
    }

    fn resolve(&self, module: &str, _globals: &ScriptGlobals) -> Option<String> {
        self.candidates(module)
            .into_iter()
            .find(|path| path.is_file())
            .map(|path| path.to_string_lossy().into_owned())
    }

    fn load(&self, key: &str, _globals: &ScriptGlobals) -> Result<ModuleSource, BridgeError> {
        let path = PathBuf::from(key);
        let text = std::fs::read_to_string(&path).map_err(|source| BridgeError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(ModuleSource {
            name: key.to_string(),
            text,
            path: Some(path),
        })
    }
}
