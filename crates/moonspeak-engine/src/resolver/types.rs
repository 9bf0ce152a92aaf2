//! Host type resolver
//!
//! Terminal resolver: a module name that matches a live host type resolves
//! to that type. The type is published once into `__moonspeak.types` and
//! the module source is a one-line lookup into that table.

use std::sync::Arc;

use moonspeak_sdk::TypeDomain;
use tracing::debug;

use crate::error::BridgeError;
use crate::globals::{ScriptGlobals, GLOBALS_NAME};

use super::{ModuleResolver, ModuleSource};

/// Resolver over every catalog in a `TypeDomain`
pub struct TypeResolver {
    domain: Arc<TypeDomain>,
}

impl TypeResolver {
    /// Resolver scanning `domain`
    pub fn new(domain: Arc<TypeDomain>) -> Self {
        Self { domain }
    }

    /// The scanned domain
    pub fn domain(&self) -> &Arc<TypeDomain> {
        &self.domain
    }
}

impl ModuleResolver for TypeResolver {
    fn label(&self) -> &str {
        "types"
    }

    fn resolve(&self, module: &str, globals: &ScriptGlobals) -> Option<String> {
        if globals.has_type(module) {
            return Some(module.to_string());
        }
        let ty = self.domain.find_type(module)?;
        if globals.publish_type(ty) {
            debug!(type_name = module, "published host type");
        }
        Some(module.to_string())
    }

    fn load(&self, key: &str, globals: &ScriptGlobals) -> Result<ModuleSource, BridgeError> {
        if !globals.has_type(key) {
            return Err(BridgeError::Resolution(key.to_string()));
        }
        Ok(ModuleSource {
            name: format!("type:{key}"),
            text: format!("{GLOBALS_NAME}.types[{key:?}]"),
            path: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moonspeak_sdk::{TypeBuilder, TypeCatalog};

    fn resolver() -> TypeResolver {
        let catalog = TypeCatalog::new("tests").with(TypeBuilder::new("Tests.LoadMe").build());
        TypeResolver::new(Arc::new(TypeDomain::new().with_catalog(catalog)))
    }

    #[test]
    fn test_resolve_publishes_once() {
        let resolver = resolver();
        let globals = ScriptGlobals::new();
        assert_eq!(resolver.resolve("Tests.LoadMe", &globals).as_deref(), Some("Tests.LoadMe"));
        assert!(globals.has_type("Tests.LoadMe"));

        let first = globals.published_type("Tests.LoadMe");
        resolver.resolve("Tests.LoadMe", &globals);
        assert_eq!(globals.published_type("Tests.LoadMe"), first);
    }

    #[test]
    fn test_load_returns_table_lookup() {
        let resolver = resolver();
        let globals = ScriptGlobals::new();
        let key = resolver.resolve("Tests.LoadMe", &globals).unwrap();
        let source = resolver.load(&key, &globals).unwrap();
        assert_eq!(source.text, "__moonspeak.types[\"Tests.LoadMe\"]");
        assert!(source.path.is_none());
    }

    #[test]
    fn test_primitives_are_resolvable() {
        let resolver = resolver();
        assert!(resolver.resolve("int", &ScriptGlobals::new()).is_some());
        assert!(resolver.resolve("Tests.Missing", &ScriptGlobals::new()).is_none());
    }
}
