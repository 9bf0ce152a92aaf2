//! Override registry
//!
//! An `OverrideTable` is the script-supplied mapping for one synthesized
//! type. The `OverrideRegistry` cell holding it is shared by the type and
//! every instance, so swapping the table reloads behavior everywhere at
//! once.

use std::sync::Arc;

use moonspeak_sdk::HostType;
use parking_lot::RwLock;
use rhai::{Dynamic, FnPtr, Map};
use rustc_hash::FxHashMap;

use crate::error::BridgeError;
use crate::marshal::script_kind;

/// Override key naming the constructor hook
pub const CONSTRUCTOR_KEY: &str = "__new";

/// Script-supplied members of one synthesized type.
///
/// Entries are usually callables; non-callable entries are allowed under
/// names that are not base methods and act as shared script-side values.
#[derive(Clone, Default)]
pub struct OverrideTable {
    entries: FxHashMap<String, Dynamic>,
}

impl OverrideTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a script map; `()` entries are dropped
    pub fn from_map(map: Map) -> Self {
        let entries = map
            .into_iter()
            .filter(|(_, value)| !value.is_unit())
            .map(|(key, value)| (key.to_string(), value))
            .collect();
        Self { entries }
    }

    /// Add a callable entry
    pub fn with(mut self, name: impl Into<String>, callable: FnPtr) -> Self {
        self.insert(name, Dynamic::from(callable));
        self
    }

    /// Add or replace an entry; `()` removes it
    pub fn insert(&mut self, name: impl Into<String>, value: Dynamic) {
        let name = name.into();
        if value.is_unit() {
            self.entries.remove(&name);
        } else {
            self.entries.insert(name, value);
        }
    }

    /// Callable registered under `name`
    pub fn callable(&self, name: &str) -> Option<FnPtr> {
        self.entries.get(name)?.clone().try_cast::<FnPtr>()
    }

    /// Raw entry under `name`
    pub fn value(&self, name: &str) -> Option<Dynamic> {
        self.entries.get(name).cloned()
    }

    /// Whether `name` has an entry
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Entry names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check the table against the base type it will override.
    ///
    /// - a base method that is not virtual cannot be overridden
    /// - a base field cannot be shadowed
    /// - virtual method entries and `__new` must be callables
    /// - any other name is a script-side helper, rejected when `strict`
    pub fn validate(&self, base: &HostType, strict: bool) -> Result<(), BridgeError> {
        for name in self.names() {
            let needs_callable = match base.method(&name) {
                Some(method) if method.is_virtual => true,
                Some(_) => return Err(unknown_member(base, &name)),
                None if name == CONSTRUCTOR_KEY => true,
                None if base.field(&name).is_some() || strict => {
                    return Err(unknown_member(base, &name))
                }
                None => false,
            };
            if needs_callable {
                if let Some(value) = self.entries.get(&name) {
                    if !value.is::<FnPtr>() {
                        return Err(BridgeError::NotCallable {
                            name,
                            got: script_kind(value),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

fn unknown_member(base: &HostType, name: &str) -> BridgeError {
    BridgeError::UnknownMember {
        type_name: base.name().to_string(),
        member: name.to_string(),
    }
}

/// Shared, swappable cell holding a type's current `OverrideTable`
pub struct OverrideRegistry {
    table: RwLock<Arc<OverrideTable>>,
}

impl OverrideRegistry {
    /// Cell holding `table`
    pub fn new(table: OverrideTable) -> Self {
        Self {
            table: RwLock::new(Arc::new(table)),
        }
    }

    /// Replace the whole table in one step
    pub fn set(&self, table: OverrideTable) {
        *self.table.write() = Arc::new(table);
    }

    /// Current callable for `name`
    pub fn get(&self, name: &str) -> Option<FnPtr> {
        self.table.read().callable(name)
    }

    /// Current raw entry for `name`
    pub fn value(&self, name: &str) -> Option<Dynamic> {
        self.table.read().value(name)
    }

    /// The current table; later swaps do not affect it
    pub fn snapshot(&self) -> Arc<OverrideTable> {
        self.table.read().clone()
    }
}

impl Default for OverrideRegistry {
    fn default() -> Self {
        Self::new(OverrideTable::new())
    }
}
