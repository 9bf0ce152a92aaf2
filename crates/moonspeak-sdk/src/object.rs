//! Host objects
//!
//! An object is a type reference plus typed field slots. Instance methods
//! are looked up by name in the type's method table, so a subclass built
//! at runtime replaces behavior for every object created from it.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use crate::error::{HostError, HostResult};
use crate::types::{check_params, TypeRef};
use crate::value::Value;

/// Shared reference to a live host object
pub type ObjectRef = Arc<HostObject>;

/// Opaque per-object payload, installed at most once
pub type ObjectExtension = Arc<dyn Any + Send + Sync>;

/// A live instance of a host type
pub struct HostObject {
    ty: TypeRef,
    fields: RwLock<Vec<Value>>,
    extension: OnceCell<ObjectExtension>,
}

impl HostObject {
    /// Allocate an object with default-initialized fields, without running a constructor
    pub fn allocate(ty: &TypeRef) -> ObjectRef {
        let fields = ty.fields().iter().map(|f| f.ty.default_value()).collect();
        Arc::new(Self {
            ty: ty.clone(),
            fields: RwLock::new(fields),
            extension: OnceCell::new(),
        })
    }

    /// Create an object, selecting the constructor by argument count.
    ///
    /// `ref`/`out` constructor arguments are written back into `args`.
    pub fn construct(ty: &TypeRef, args: &mut [Value]) -> HostResult<ObjectRef> {
        if ty.is_abstract() {
            return Err(HostError::NotConstructible(ty.name().to_string()));
        }
        let ctor = ty
            .constructors()
            .iter()
            .find(|c| c.params.len() == args.len())
            .ok_or_else(|| match ty.constructors().first() {
                Some(first) => HostError::Arity {
                    name: ty.name().to_string(),
                    expected: first.params.len(),
                    got: args.len(),
                },
                None => HostError::NotConstructible(ty.name().to_string()),
            })?;

        check_params(ty.name(), &ctor.params, args)?;
        let object = Self::allocate(ty);
        if let Some(body) = &ctor.body {
            body(&object, args)?;
        }
        Ok(object)
    }

    /// Runtime type of the object
    pub fn host_type(&self) -> &TypeRef {
        &self.ty
    }

    /// Read a field by name
    pub fn get_field(&self, name: &str) -> HostResult<Value> {
        let (index, _) = self.field_slot(name)?;
        Ok(self.fields.read()[index].clone())
    }

    /// Write a field by name; the value must convert losslessly to the field type
    pub fn set_field(&self, name: &str, value: Value) -> HostResult<()> {
        let (index, ty) = self.field_slot(name)?;
        let value = ty.coerce(value)?;
        self.fields.write()[index] = value;
        Ok(())
    }

    fn field_slot(&self, name: &str) -> HostResult<(usize, crate::value::ValueType)> {
        self.ty
            .field(name)
            .map(|(index, def)| (index, def.ty))
            .ok_or_else(|| HostError::UnknownMember {
                type_name: self.ty.name().to_string(),
                member: name.to_string(),
            })
    }

    /// Call an instance method through the type's method table.
    ///
    /// Arguments are checked against the signature first; `ref`/`out`
    /// arguments hold the callee's writes when this returns.
    pub fn invoke(this: &ObjectRef, name: &str, args: &mut [Value]) -> HostResult<Value> {
        let method = this.ty.method(name).ok_or_else(|| HostError::UnknownMember {
            type_name: this.ty.name().to_string(),
            member: name.to_string(),
        })?;
        method.sig.check_args(args)?;
        match &method.body {
            Some(body) => body(this, args),
            None => Err(HostError::AbstractMethod {
                type_name: method.declaring_type.clone(),
                method: name.to_string(),
            }),
        }
    }

    /// Install the extension payload, or return the existing one
    pub fn extension_or_init<F>(&self, init: F) -> &ObjectExtension
    where
        F: FnOnce() -> ObjectExtension,
    {
        self.extension.get_or_init(init)
    }

    /// Typed view of the extension payload
    pub fn extension<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.extension.get()?.downcast_ref::<T>()
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostObject")
            .field("type", &self.ty.name())
            .field("fields", &*self.fields.read())
            .finish()
    }
}
