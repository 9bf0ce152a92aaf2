//! Script global state
//!
//! `__moonspeak` is the one global every environment exposes to scripts.
//! Its `types` table holds the host types the type resolver has
//! published, keyed by fully-qualified name.

use std::sync::Arc;

use moonspeak_sdk::TypeRef;
use parking_lot::RwLock;
use rhai::Scope;
use rustc_hash::FxHashMap;

use crate::handles::TypeHandle;

/// Script name of the global table
pub const GLOBALS_NAME: &str = "__moonspeak";

/// The `__moonspeak.types` table; indexing it looks up one entry
#[derive(Clone, Default)]
pub struct PublishedTypes {
    entries: Arc<RwLock<FxHashMap<String, TypeHandle>>>,
}

impl PublishedTypes {
    /// Handle published under `name`
    pub fn get(&self, name: &str) -> Option<TypeHandle> {
        self.entries.read().get(name).cloned()
    }

    /// Number of published types
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing has been published
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Published names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Shared state behind the `__moonspeak` global
#[derive(Clone, Default)]
pub struct ScriptGlobals {
    types: PublishedTypes,
}

impl ScriptGlobals {
    /// Empty globals
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a type under its name; returns false if already published
    pub fn publish_type(&self, ty: TypeRef) -> bool {
        let mut types = self.types.entries.write();
        if types.contains_key(ty.name()) {
            return false;
        }
        types.insert(ty.name().to_string(), TypeHandle::new(ty));
        true
    }

    /// Whether `name` has been published
    pub fn has_type(&self, name: &str) -> bool {
        self.types.entries.read().contains_key(name)
    }

    /// Published handle for `name`
    pub fn published_type(&self, name: &str) -> Option<TypeHandle> {
        self.types.get(name)
    }

    /// Forget every published type
    pub fn clear_types(&self) {
        self.types.entries.write().clear();
    }

    /// The `types` table; shares state with these globals
    pub fn types(&self) -> PublishedTypes {
        self.types.clone()
    }

    /// Fresh scope with `__moonspeak` bound
    pub fn scope(&self) -> Scope<'static> {
        let mut scope = Scope::new();
        scope.push_constant(GLOBALS_NAME, self.clone());
        scope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moonspeak_sdk::TypeBuilder;

    #[test]
    fn test_publish_is_memoized() {
        let globals = ScriptGlobals::new();
        let ty = TypeBuilder::new("Tests.LoadMe").build();
        assert!(globals.publish_type(ty.clone()));
        assert!(!globals.publish_type(ty.clone()));
        assert!(globals.has_type("Tests.LoadMe"));
        assert_eq!(globals.published_type("Tests.LoadMe"), Some(TypeHandle::new(ty)));
    }

    #[test]
    fn test_types_table_and_clones_share_state() {
        let globals = ScriptGlobals::new();
        let view = globals.clone();
        let table = view.types();
        assert!(table.is_empty());

        globals.publish_type(TypeBuilder::new("B").build());
        globals.publish_type(TypeBuilder::new("A").build());
        assert_eq!(table.len(), 2);
        assert_eq!(table.names(), vec!["A".to_string(), "B".to_string()]);
        assert!(table.get("A").is_some());
        assert!(table.get("C").is_none());

        view.clear_types();
        assert!(!globals.has_type("A"));
    }
}
