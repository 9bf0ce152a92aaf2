//! Dynamic type factory
//!
//! `make_type` derives a concrete host type from a base type whose virtual
//! methods route into script overrides. For every virtual method `m` of
//! the base the new type gets:
//!
//! - `base_<m>`, which always runs the base implementation
//! - `m`, which runs the override registered under `m` or falls through to
//!   the base implementation when there is none
//!
//! A second `make_type` with the same name in the same environment swaps
//! the override table of the existing type instead of building a new one,
//! so existing instances pick up reloaded behavior.

mod dispatch;

pub use dispatch::{call_override, BASE_PREFIX};

use std::sync::Arc;

use moonspeak_sdk::{HostType, TypeBuilder, TypeCatalog, TypeExtension, TypeRef};
use parking_lot::Mutex;
use rhai::{Dynamic, FnPtr};
use tracing::{debug, info, warn};

use crate::env::{ScriptEnv, WeakEnv};
use crate::error::{BridgeError, BridgeResult};
use crate::registry::{OverrideRegistry, OverrideTable};

// ============================================================================
// Type statics
// ============================================================================

/// Back-references stored in a synthesized type's extension slot
pub struct TypeStatics {
    registry: Arc<OverrideRegistry>,
    env: WeakEnv,
    base: TypeRef,
}

impl TypeStatics {
    /// Statics of `ty`, if it was synthesized by `make_type`
    pub fn of(ty: &HostType) -> Option<&TypeStatics> {
        ty.extension::<TypeStatics>()
    }

    /// The override registry cell shared by the type and its instances
    pub fn registry(&self) -> &Arc<OverrideRegistry> {
        &self.registry
    }

    /// The base type the type was derived from
    pub fn base(&self) -> &TypeRef {
        &self.base
    }

    /// Id of the owning environment
    pub fn env_id(&self) -> &str {
        self.env.id()
    }

    /// The owning environment, if it is still alive
    pub fn env(&self) -> BridgeResult<ScriptEnv> {
        self.env.get()
    }
}

// ============================================================================
// Type module
// ============================================================================

/// Per-environment scope of synthesized types, keyed by name
pub struct TypeModule {
    catalog: Arc<TypeCatalog>,
}

impl TypeModule {
    /// Empty module; its catalog is named `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            catalog: Arc::new(TypeCatalog::new(name)),
        }
    }

    /// Catalog of every type synthesized so far, shareable with a
    /// `TypeDomain`
    pub fn catalog(&self) -> &Arc<TypeCatalog> {
        &self.catalog
    }

    /// Synthesized type by name
    pub fn get(&self, name: &str) -> Option<TypeRef> {
        self.catalog.get(name)
    }

    /// Override registry of a synthesized type
    pub fn registry(&self, name: &str) -> Option<Arc<OverrideRegistry>> {
        let ty = self.get(name)?;
        TypeStatics::of(&ty).map(|statics| statics.registry().clone())
    }

    /// Names of every synthesized type, sorted
    pub fn type_names(&self) -> Vec<String> {
        self.catalog.type_names()
    }
}

// ============================================================================
// Configurator handle
// ============================================================================

/// Method declared through `ClassBuilder::expose`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExposedMethod {
    /// Method name; must have an override entry
    pub name: String,
    /// Number of untyped parameters, not counting `me`
    pub arity: usize,
}

/// Handle passed to a `class` configurator (`ClassBuilder` in scripts)
#[derive(Clone, Default)]
pub struct ClassBuilder {
    exposed: Arc<Mutex<Vec<ExposedMethod>>>,
}

impl ClassBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a host-visible method that dispatches to the override of
    /// the same name
    pub fn expose(&self, name: impl Into<String>, arity: usize) {
        self.exposed.lock().push(ExposedMethod {
            name: name.into(),
            arity,
        });
    }

    /// Declared methods, in declaration order
    pub fn exposed(&self) -> Vec<ExposedMethod> {
        self.exposed.lock().clone()
    }
}

// ============================================================================
// make_type
// ============================================================================

/// Synthesize `name` from `base`, or reload it if `env` already has it.
///
/// The overrides are validated first; a failure leaves any existing type
/// and its registry untouched. The configurator only runs on first
/// synthesis.
pub fn make_type(
    env: &ScriptEnv,
    base: &TypeRef,
    name: &str,
    overrides: OverrideTable,
    configurator: Option<&FnPtr>,
) -> BridgeResult<TypeRef> {
    overrides.validate(base, env.config().strict_overrides)?;

    if let Some(existing) = env.types().get(name) {
        if let Some(statics) = TypeStatics::of(&existing) {
            if !Arc::ptr_eq(statics.base(), base) {
                warn!(
                    bundle = env.id(),
                    type_name = name,
                    old_base = statics.base().name(),
                    new_base = base.name(),
                    "reload keeps the original base type"
                );
            }
            statics.registry().set(overrides);
            info!(bundle = env.id(), type_name = name, "reloaded overrides");
            return Ok(existing);
        }
    }

    let override_count = overrides.len();
    let statics = Arc::new(TypeStatics {
        registry: Arc::new(OverrideRegistry::new(overrides)),
        env: env.downgrade(),
        base: base.clone(),
    });

    let mut builder = TypeBuilder::derive(base, name).extension(statics.clone() as TypeExtension);

    if base.constructors().is_empty() {
        builder.push_constructor(dispatch::constructor(None, &statics));
    } else {
        for ctor in base.constructors() {
            builder.push_constructor(dispatch::constructor(Some(ctor), &statics));
        }
    }

    let virtuals: Vec<_> = base.virtual_methods().cloned().collect();
    for method in &virtuals {
        let caller = dispatch::base_caller(&builder, method);
        builder.push_method(caller);
        let dispatcher = dispatch::override_method(&builder, method, &statics);
        builder.push_method(dispatcher);
    }

    if let Some(configurator) = configurator {
        let handle = ClassBuilder::new();
        // only the declarations made through the handle matter
        let _ = env.call(configurator, vec![Dynamic::from(handle.clone())])?;
        for exposed in handle.exposed() {
            if base.has_member(&exposed.name) || exposed.name.starts_with(BASE_PREFIX) {
                return Err(BridgeError::DuplicateMember {
                    type_name: name.to_string(),
                    member: exposed.name,
                });
            }
            if !statics.registry().snapshot().contains(&exposed.name) {
                return Err(BridgeError::UnknownMember {
                    type_name: name.to_string(),
                    member: exposed.name,
                });
            }
            let def = dispatch::exposed_method(&builder, &exposed, &statics);
            builder.push_method(def);
        }
    }

    let ty = builder.build();
    env.types().catalog().register(ty.clone());
    debug!(
        bundle = env.id(),
        type_name = name,
        base = base.name(),
        overrides = override_count,
        methods = virtuals.len(),
        "synthesized type"
    );
    Ok(ty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_builder_shares_declarations() {
        let builder = ClassBuilder::new();
        let script_side = builder.clone();
        script_side.expose("Greet", 1);
        assert_eq!(
            builder.exposed(),
            vec![ExposedMethod {
                name: "Greet".to_string(),
                arity: 1
            }]
        );
    }

    #[test]
    fn test_type_module_starts_empty() {
        let module = TypeModule::new("bundle");
        assert_eq!(module.catalog().name(), "bundle");
        assert!(module.get("Anything").is_none());
        assert!(module.registry("Anything").is_none());
    }
}
