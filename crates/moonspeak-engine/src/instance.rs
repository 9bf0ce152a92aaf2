//! Instance state bridge
//!
//! Every instance of a synthesized type carries an `InstanceState` in its
//! extension slot: a private store of script-assigned members plus the
//! type's override registry. Member reads resolve in this order:
//!
//! 1. the instance's own store
//! 2. the override registry
//! 3. a declared host field
//! 4. a host method, as a bound method value
//!
//! Writes to declared host fields are type checked; everything else lands
//! in the store.

use std::sync::Arc;

use moonspeak_sdk::{ObjectExtension, ObjectRef};
use parking_lot::RwLock;
use rhai::Dynamic;
use rustc_hash::FxHashMap;

use crate::error::BridgeError;
use crate::handles::{BoundMethod, ObjectHandle};
use crate::marshal;
use crate::registry::OverrideRegistry;

/// Per-instance script state
pub struct InstanceState {
    registry: Arc<OverrideRegistry>,
    store: RwLock<FxHashMap<String, Dynamic>>,
}

impl InstanceState {
    /// Empty state bound to a type's registry
    pub fn new(registry: Arc<OverrideRegistry>) -> Self {
        Self {
            registry,
            store: RwLock::new(FxHashMap::default()),
        }
    }

    /// State of `object`, if it is an instance of a synthesized type
    pub fn of(object: &ObjectRef) -> Option<&InstanceState> {
        object.extension::<InstanceState>()
    }

    /// State of `object`, installing an empty one on first use
    pub fn attach<'a>(object: &'a ObjectRef, registry: &Arc<OverrideRegistry>) -> Option<&'a InstanceState> {
        object
            .extension_or_init(|| Arc::new(InstanceState::new(registry.clone())) as ObjectExtension)
            .downcast_ref::<InstanceState>()
    }

    /// The type's override registry
    pub fn registry(&self) -> &Arc<OverrideRegistry> {
        &self.registry
    }

    /// Value in the private store
    pub fn stored(&self, name: &str) -> Option<Dynamic> {
        self.store.read().get(name).cloned()
    }

    /// Whether the private store has `name`
    pub fn contains(&self, name: &str) -> bool {
        self.store.read().contains_key(name)
    }

    /// Write into the private store; `()` removes the entry
    pub fn store(&self, name: &str, value: Dynamic) {
        let mut store = self.store.write();
        if value.is_unit() {
            store.remove(name);
        } else {
            store.insert(name.to_string(), value);
        }
    }

    /// Names in the private store, sorted
    pub fn stored_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.store.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl ObjectHandle {
    /// Read a member as a script sees it; unknown names read as `()`
    pub fn get(&self, name: &str) -> Result<Dynamic, BridgeError> {
        let object = self.object();
        if let Some(state) = InstanceState::of(object) {
            if let Some(value) = state.stored(name) {
                return Ok(value);
            }
            if let Some(value) = state.registry().value(name) {
                return Ok(value);
            }
        }

        let ty = object.host_type();
        if let Some((_, field)) = ty.field(name) {
            let value = object.get_field(name)?;
            return Ok(marshal::to_script(&value, field.ty));
        }
        if ty.method(name).is_some() {
            return Ok(Dynamic::from(BoundMethod::new(object.clone(), name)));
        }
        Ok(Dynamic::UNIT)
    }

    /// Write a member.
    ///
    /// A declared host field only accepts a value convertible to its type;
    /// on mismatch nothing is written anywhere. Other names go to the
    /// private store, which only synthesized instances have.
    pub fn try_set(&self, name: &str, value: Dynamic) -> Result<(), BridgeError> {
        let object = self.object();
        let ty = object.host_type();
        if let Some((_, field)) = ty.field(name) {
            let converted = marshal::from_script(&value, field.ty).map_err(|err| BridgeError::TypeMismatch {
                field: name.to_string(),
                expected: field.ty,
                got: err.got,
            })?;
            object.set_field(name, converted)?;
            return Ok(());
        }

        match InstanceState::of(object) {
            Some(state) => {
                state.store(name, value);
                Ok(())
            }
            None => Err(BridgeError::UnknownMember {
                type_name: ty.name().to_string(),
                member: name.to_string(),
            }),
        }
    }
}
