//! Script-facing handles to host values
//!
//! Host objects and host types never get copied into the script
//! environment; scripts hold these handles instead, and every access goes
//! back through the host object model.

use std::fmt;
use std::sync::Arc;

use moonspeak_sdk::{ObjectRef, TypeRef};

/// Script handle to a host type (`HostType` in scripts)
#[derive(Clone)]
pub struct TypeHandle(TypeRef);

impl TypeHandle {
    /// Wrap a type
    pub fn new(ty: TypeRef) -> Self {
        Self(ty)
    }

    /// The wrapped type
    pub fn host_type(&self) -> &TypeRef {
        &self.0
    }

    /// Unwrap
    pub fn into_inner(self) -> TypeRef {
        self.0
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostType({})", self.0.name())
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.name())
    }
}

/// Script handle to a host object (`HostObject` in scripts).
///
/// This is the value an override receives in its leading `me` slot.
#[derive(Clone)]
pub struct ObjectHandle(ObjectRef);

impl ObjectHandle {
    /// Wrap an object
    pub fn new(object: ObjectRef) -> Self {
        Self(object)
    }

    /// The wrapped object
    pub fn object(&self) -> &ObjectRef {
        &self.0
    }

    /// Unwrap
    pub fn into_inner(self) -> ObjectRef {
        self.0
    }
}

impl PartialEq for ObjectHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostObject({})", self.0.host_type().name())
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} instance>", self.0.host_type().name())
    }
}

/// A host method read off an object as a value (`HostMethod` in scripts)
#[derive(Clone)]
pub struct BoundMethod {
    object: ObjectRef,
    name: String,
}

impl BoundMethod {
    /// Bind `name` to `object`
    pub fn new(object: ObjectRef, name: impl Into<String>) -> Self {
        Self {
            object,
            name: name.into(),
        }
    }

    /// Receiver
    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostMethod({}.{})", self.object.host_type().name(), self.name)
    }
}
