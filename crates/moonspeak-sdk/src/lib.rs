//! MoonSpeak SDK - host object model
//!
//! This crate describes the host side of the script bridge without
//! depending on any script engine:
//! - **Values**: `Value` and the declared `ValueType` of slots
//! - **Types**: `HostType` descriptors with typed fields, constructors,
//!   a by-name virtual method table and static methods, built with
//!   `TypeBuilder`
//! - **Objects**: `HostObject` instances that dispatch calls through their
//!   type's method table, writing `ref`/`out` arguments back into the
//!   caller's slots
//! - **Catalogs**: named sets of types, and the `TypeDomain` that scans them
//!
//! # Example
//!
//! ```rust,ignore
//! use moonspeak_sdk::{HostObject, MethodSig, Param, TypeBuilder, Value, ValueType};
//!
//! let ty = TypeBuilder::new("Demo.Squarer")
//!     .default_constructor()
//!     .virtual_method(
//!         MethodSig::new("Square", ValueType::Void).param(Param::by_ref("i", ValueType::Int)),
//!         |_, args| {
//!             let i = args[0].as_i32().unwrap_or(0);
//!             args[0] = Value::Int(i * i);
//!             Ok(Value::Null)
//!         },
//!     )
//!     .build();
//!
//! let obj = HostObject::construct(&ty, &mut []).unwrap();
//! let mut args = [Value::Int(16)];
//! HostObject::invoke(&obj, "Square", &mut args).unwrap();
//! assert_eq!(args[0], Value::Int(256));
//! ```

#![warn(missing_docs)]

pub mod catalog;
pub mod error;
pub mod object;
pub mod types;
pub mod value;

pub use catalog::{primitive_type, TypeCatalog, TypeDomain, CORE_CATALOG};
pub use error::{HostError, HostResult};
pub use object::{HostObject, ObjectExtension, ObjectRef};
pub use types::{
    ConstructorDef, CtorFn, FieldDef, HostType, MethodDef, MethodFn, MethodSig, Param,
    ParamDirection, StaticFn, StaticMethodDef, TypeBuilder, TypeExtension, TypeRef,
};
pub use value::{Value, ValueType};
