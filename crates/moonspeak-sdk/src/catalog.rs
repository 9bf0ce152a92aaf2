//! Type catalogs and the type domain
//!
//! A catalog is a named set of host types keyed by fully-qualified name,
//! the host analogue of one loaded assembly. The domain is the ordered list
//! of every catalog the process has loaded; name lookups scan it in
//! registration order and the first match wins.

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::types::{TypeBuilder, TypeRef};
use crate::value::ValueType;

/// Name of the catalog holding the primitive types
pub const CORE_CATALOG: &str = "core";

static PRIMITIVES: Lazy<FxHashMap<ValueType, TypeRef>> = Lazy::new(|| {
    [
        ValueType::Bool,
        ValueType::Int,
        ValueType::Long,
        ValueType::Float,
        ValueType::Str,
    ]
    .into_iter()
    .map(|vt| (vt, TypeBuilder::new(vt.name()).build()))
    .collect()
});

/// Process-wide descriptor for a primitive value type
pub fn primitive_type(ty: ValueType) -> Option<TypeRef> {
    PRIMITIVES.get(&ty).cloned()
}

// ============================================================================
// TypeCatalog
// ============================================================================

/// Named collection of host types
#[derive(Debug)]
pub struct TypeCatalog {
    name: String,
    types: RwLock<FxHashMap<String, TypeRef>>,
}

impl TypeCatalog {
    /// Create an empty catalog
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: RwLock::new(FxHashMap::default()),
        }
    }

    /// Catalog holding the primitive types
    pub fn core() -> Self {
        let catalog = Self::new(CORE_CATALOG);
        for ty in PRIMITIVES.values() {
            catalog.register(ty.clone());
        }
        catalog
    }

    /// Catalog name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a type, replacing any type registered under the same name
    pub fn register(&self, ty: TypeRef) {
        self.types.write().insert(ty.name().to_string(), ty);
    }

    /// Builder-style registration
    pub fn with(self, ty: TypeRef) -> Self {
        self.register(ty);
        self
    }

    /// Look up a type by fully-qualified name
    pub fn get(&self, name: &str) -> Option<TypeRef> {
        self.types.read().get(name).cloned()
    }

    /// Number of types
    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }

    /// Sorted type names
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.read().keys().cloned().collect();
        names.sort();
        names
    }
}

// ============================================================================
// TypeDomain
// ============================================================================

/// Every loaded catalog, in registration order
#[derive(Debug)]
pub struct TypeDomain {
    catalogs: RwLock<Vec<Arc<TypeCatalog>>>,
}

impl TypeDomain {
    /// Domain containing only the core catalog
    pub fn new() -> Self {
        Self {
            catalogs: RwLock::new(vec![Arc::new(TypeCatalog::core())]),
        }
    }

    /// Append a catalog
    pub fn add_catalog(&self, catalog: Arc<TypeCatalog>) {
        self.catalogs.write().push(catalog);
    }

    /// Builder-style append
    pub fn with_catalog(self, catalog: TypeCatalog) -> Self {
        self.add_catalog(Arc::new(catalog));
        self
    }

    /// Remove every catalog with this name; returns how many were removed
    pub fn remove_catalog(&self, name: &str) -> usize {
        let mut catalogs = self.catalogs.write();
        let before = catalogs.len();
        catalogs.retain(|c| c.name() != name);
        before - catalogs.len()
    }

    /// Find a type by fully-qualified name, scanning every catalog
    pub fn find_type(&self, name: &str) -> Option<TypeRef> {
        self.catalogs.read().iter().find_map(|c| c.get(name))
    }

    /// Snapshot of the catalog list
    pub fn catalogs(&self) -> Vec<Arc<TypeCatalog>> {
        self.catalogs.read().clone()
    }
}

impl Default for TypeDomain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_catalog_has_primitives() {
        let domain = TypeDomain::new();
        let int = domain.find_type("int").unwrap();
        assert!(Arc::ptr_eq(&int, &primitive_type(ValueType::Int).unwrap()));
        assert!(domain.find_type("object").is_none());
    }

    #[test]
    fn test_first_catalog_wins() {
        let first = TypeBuilder::new("Game.Pawn").build();
        let second = TypeBuilder::new("Game.Pawn").build();
        let domain = TypeDomain::new()
            .with_catalog(TypeCatalog::new("a").with(first.clone()))
            .with_catalog(TypeCatalog::new("b").with(second));

        assert!(Arc::ptr_eq(&domain.find_type("Game.Pawn").unwrap(), &first));
        assert_eq!(domain.remove_catalog("a"), 1);
        assert!(!Arc::ptr_eq(&domain.find_type("Game.Pawn").unwrap(), &first));
    }

    #[test]
    fn test_catalog_late_registration_visible() {
        let catalog = Arc::new(TypeCatalog::new("late"));
        let domain = TypeDomain::new();
        domain.add_catalog(catalog.clone());
        assert!(domain.find_type("Late.Thing").is_none());

        catalog.register(TypeBuilder::new("Late.Thing").build());
        assert!(domain.find_type("Late.Thing").is_some());
        assert_eq!(catalog.type_names(), vec!["Late.Thing".to_string()]);
    }
}
