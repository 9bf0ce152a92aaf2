//! Host type descriptors
//!
//! A `HostType` is the immutable description of a host class: its typed
//! fields, its constructors, its methods (virtual ones are reachable by name
//! through the method table), its static methods and an opaque extension
//! slot. Types are built once with [`TypeBuilder`] and shared as [`TypeRef`].

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::{HostError, HostResult};
use crate::object::ObjectRef;
use crate::value::{Value, ValueType};

/// Shared, immutable reference to a host type
pub type TypeRef = Arc<HostType>;

/// Instance method body: receives the object and the argument slots
pub type MethodFn = Arc<dyn Fn(&ObjectRef, &mut [Value]) -> HostResult<Value> + Send + Sync>;

/// Constructor body: runs against an allocated, default-initialized object
pub type CtorFn = Arc<dyn Fn(&ObjectRef, &mut [Value]) -> HostResult<()> + Send + Sync>;

/// Static method body
pub type StaticFn = Arc<dyn Fn(&mut [Value]) -> HostResult<Value> + Send + Sync>;

/// Opaque per-type payload installed by whoever built the type
pub type TypeExtension = Arc<dyn Any + Send + Sync>;

// ============================================================================
// Signatures
// ============================================================================

/// How an argument travels between caller and callee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamDirection {
    /// Passed by value
    In,
    /// Passed by reference: read and written by the callee
    Ref,
    /// Output only: written by the callee
    Out,
}

impl ParamDirection {
    /// Whether the callee's write is visible to the caller
    pub fn is_output(&self) -> bool {
        !matches!(self, ParamDirection::In)
    }
}

/// A declared method or constructor parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Parameter name
    pub name: String,
    /// Declared type (element type for ref/out parameters)
    pub ty: ValueType,
    /// Passing direction
    pub direction: ParamDirection,
}

impl Param {
    /// By-value parameter
    pub fn new(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            name: name.into(),
            ty,
            direction: ParamDirection::In,
        }
    }

    /// `ref` parameter
    pub fn by_ref(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            direction: ParamDirection::Ref,
            ..Self::new(name, ty)
        }
    }

    /// `out` parameter
    pub fn out(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            direction: ParamDirection::Out,
            ..Self::new(name, ty)
        }
    }
}

/// Method signature: name, ordered parameters, return type
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSig {
    /// Method name
    pub name: String,
    /// Ordered parameters
    pub params: Vec<Param>,
    /// Return type (`ValueType::Void` for none)
    pub ret: ValueType,
}

impl MethodSig {
    /// Create a signature with no parameters
    pub fn new(name: impl Into<String>, ret: ValueType) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            ret,
        }
    }

    /// Append a parameter
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Same signature under another name
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Number of declared parameters
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Number of `ref`/`out` parameters
    pub fn ref_count(&self) -> usize {
        self.params.iter().filter(|p| p.direction.is_output()).count()
    }

    /// Positions of `ref`/`out` parameters, left to right
    pub fn ref_positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.params
            .iter()
            .enumerate()
            .filter(|(_, p)| p.direction.is_output())
            .map(|(i, _)| i)
    }

    /// Whether the method returns nothing
    pub fn returns_void(&self) -> bool {
        self.ret == ValueType::Void
    }

    /// Check the argument count, then coerce every slot to its declared type
    pub fn check_args(&self, args: &mut [Value]) -> HostResult<()> {
        check_params(&self.name, &self.params, args)
    }
}

pub(crate) fn check_params(name: &str, params: &[Param], args: &mut [Value]) -> HostResult<()> {
    if params.len() != args.len() {
        return Err(HostError::Arity {
            name: name.to_string(),
            expected: params.len(),
            got: args.len(),
        });
    }
    for (param, slot) in params.iter().zip(args.iter_mut()) {
        *slot = param.ty.coerce(slot.clone())?;
    }
    Ok(())
}

// ============================================================================
// Members
// ============================================================================

/// Typed instance field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Field name
    pub name: String,
    /// Declared type
    pub ty: ValueType,
}

/// Constructor: parameter list plus optional body
#[derive(Clone)]
pub struct ConstructorDef {
    /// Ordered parameters
    pub params: Vec<Param>,
    /// Body run after field initialization (`None` only initializes fields)
    pub body: Option<CtorFn>,
}

impl ConstructorDef {
    /// Parameterless constructor with no body
    pub fn default_ctor() -> Self {
        Self {
            params: Vec::new(),
            body: None,
        }
    }
}

/// Instance method entry
#[derive(Clone)]
pub struct MethodDef {
    /// Signature
    pub sig: Arc<MethodSig>,
    /// Implementation (`None` for abstract methods)
    pub body: Option<MethodFn>,
    /// Whether subclasses may replace it
    pub is_virtual: bool,
    /// Name of the type that supplied the body
    pub declaring_type: String,
}

/// Static method entry
#[derive(Clone)]
pub struct StaticMethodDef {
    /// Signature
    pub sig: Arc<MethodSig>,
    /// Implementation
    pub body: StaticFn,
}

// ============================================================================
// HostType
// ============================================================================

/// Immutable host class descriptor
pub struct HostType {
    name: String,
    parent: Option<TypeRef>,
    is_abstract: bool,
    fields: Vec<FieldDef>,
    field_indices: FxHashMap<String, usize>,
    constructors: Vec<ConstructorDef>,
    methods: Vec<MethodDef>,
    method_indices: FxHashMap<String, usize>,
    statics: FxHashMap<String, StaticMethodDef>,
    extension: Option<TypeExtension>,
}

impl HostType {
    /// Fully-qualified name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direct parent type
    pub fn parent(&self) -> Option<&TypeRef> {
        self.parent.as_ref()
    }

    /// Whether instances may only be created through a subclass
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// All instance fields, inherited ones first
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Look up a field slot by name
    pub fn field(&self, name: &str) -> Option<(usize, &FieldDef)> {
        let index = *self.field_indices.get(name)?;
        Some((index, &self.fields[index]))
    }

    /// Declared constructors
    pub fn constructors(&self) -> &[ConstructorDef] {
        &self.constructors
    }

    /// All instance methods in table order
    pub fn methods(&self) -> &[MethodDef] {
        &self.methods
    }

    /// Instance methods that subclasses may replace
    pub fn virtual_methods(&self) -> impl Iterator<Item = &MethodDef> {
        self.methods.iter().filter(|m| m.is_virtual)
    }

    /// Look up an instance method by name
    pub fn method(&self, name: &str) -> Option<&MethodDef> {
        self.method_indices.get(name).map(|&i| &self.methods[i])
    }

    /// Whether a field or method with this name exists
    pub fn has_member(&self, name: &str) -> bool {
        self.field_indices.contains_key(name) || self.method_indices.contains_key(name)
    }

    /// Look up a static method by name
    pub fn static_method(&self, name: &str) -> Option<&StaticMethodDef> {
        self.statics.get(name)
    }

    /// Call a static method
    pub fn invoke_static(&self, name: &str, args: &mut [Value]) -> HostResult<Value> {
        let method = self.statics.get(name).ok_or_else(|| HostError::UnknownMember {
            type_name: self.name.clone(),
            member: name.to_string(),
        })?;
        method.sig.check_args(args)?;
        (method.body)(args)
    }

    /// Typed view of the extension slot
    pub fn extension<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.extension.as_ref()?.downcast_ref::<T>()
    }

    /// Whether this type is `other` or derives from it
    pub fn is_subclass_of(&self, other: &HostType) -> bool {
        let mut current = Some(self);
        while let Some(ty) = current {
            if std::ptr::eq(ty, other) {
                return true;
            }
            current = ty.parent.as_deref();
        }
        false
    }
}

impl fmt::Debug for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostType")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name().to_string()))
            .field("is_abstract", &self.is_abstract)
            .field("fields", &self.fields)
            .field("constructors", &self.constructors.len())
            .field("methods", &self.methods.iter().map(|m| &m.sig.name).collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// TypeBuilder
// ============================================================================

/// Builder for host types
pub struct TypeBuilder {
    name: String,
    parent: Option<TypeRef>,
    is_abstract: bool,
    fields: Vec<FieldDef>,
    constructors: Vec<ConstructorDef>,
    methods: Vec<MethodDef>,
    method_indices: FxHashMap<String, usize>,
    statics: FxHashMap<String, StaticMethodDef>,
    extension: Option<TypeExtension>,
}

impl TypeBuilder {
    /// Start a root type
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            is_abstract: false,
            fields: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            method_indices: FxHashMap::default(),
            statics: FxHashMap::default(),
            extension: None,
        }
    }

    /// Start a subclass of `base`.
    ///
    /// Fields and the method table are inherited; constructors, statics and
    /// the extension slot are not.
    pub fn derive(base: &TypeRef, name: impl Into<String>) -> Self {
        let mut builder = Self::new(name);
        builder.parent = Some(base.clone());
        builder.fields = base.fields.clone();
        builder.methods = base.methods.clone();
        builder.method_indices = base.method_indices.clone();
        builder
    }

    /// Name of the type being built
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mark the type abstract
    pub fn as_abstract(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Add a typed field
    pub fn field(mut self, name: impl Into<String>, ty: ValueType) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            ty,
        });
        self
    }

    /// Add a constructor
    pub fn constructor<F>(mut self, params: Vec<Param>, body: F) -> Self
    where
        F: Fn(&ObjectRef, &mut [Value]) -> HostResult<()> + Send + Sync + 'static,
    {
        self.constructors.push(ConstructorDef {
            params,
            body: Some(Arc::new(body)),
        });
        self
    }

    /// Add a parameterless constructor that only initializes fields
    pub fn default_constructor(mut self) -> Self {
        self.constructors.push(ConstructorDef::default_ctor());
        self
    }

    /// Add a non-virtual method
    pub fn method<F>(mut self, sig: MethodSig, body: F) -> Self
    where
        F: Fn(&ObjectRef, &mut [Value]) -> HostResult<Value> + Send + Sync + 'static,
    {
        let def = self.method_def(sig, Some(Arc::new(body)), false);
        self.push_method(def);
        self
    }

    /// Add a virtual method
    pub fn virtual_method<F>(mut self, sig: MethodSig, body: F) -> Self
    where
        F: Fn(&ObjectRef, &mut [Value]) -> HostResult<Value> + Send + Sync + 'static,
    {
        let def = self.method_def(sig, Some(Arc::new(body)), true);
        self.push_method(def);
        self
    }

    /// Add a virtual method without implementation
    pub fn abstract_method(mut self, sig: MethodSig) -> Self {
        let def = self.method_def(sig, None, true);
        self.push_method(def);
        self
    }

    /// Add a static method
    pub fn static_method<F>(mut self, sig: MethodSig, body: F) -> Self
    where
        F: Fn(&mut [Value]) -> HostResult<Value> + Send + Sync + 'static,
    {
        self.statics.insert(
            sig.name.clone(),
            StaticMethodDef {
                sig: Arc::new(sig),
                body: Arc::new(body),
            },
        );
        self
    }

    /// Install the extension payload
    pub fn extension(mut self, extension: TypeExtension) -> Self {
        self.extension = Some(extension);
        self
    }

    /// Add a constructor entry
    pub fn push_constructor(&mut self, ctor: ConstructorDef) {
        self.constructors.push(ctor);
    }

    /// Add a method entry, replacing an inherited entry of the same name
    pub fn push_method(&mut self, def: MethodDef) {
        match self.method_indices.get(&def.sig.name) {
            Some(&index) => self.methods[index] = def,
            None => {
                self.method_indices.insert(def.sig.name.clone(), self.methods.len());
                self.methods.push(def);
            }
        }
    }

    /// Build a method entry declared by this type
    pub fn method_def(&self, sig: MethodSig, body: Option<MethodFn>, is_virtual: bool) -> MethodDef {
        MethodDef {
            sig: Arc::new(sig),
            body,
            is_virtual,
            declaring_type: self.name.clone(),
        }
    }

    /// Finish the type
    pub fn build(self) -> TypeRef {
        let field_indices = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();

        Arc::new(HostType {
            name: self.name,
            parent: self.parent,
            is_abstract: self.is_abstract,
            fields: self.fields,
            field_indices,
            constructors: self.constructors,
            methods: self.methods,
            method_indices: self.method_indices,
            statics: self.statics,
            extension: self.extension,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape() -> TypeRef {
        TypeBuilder::new("Geo.Shape")
            .as_abstract()
            .field("sides", ValueType::Int)
            .virtual_method(MethodSig::new("Area", ValueType::Float), |_, _| {
                Ok(Value::Float(0.0))
            })
            .method(MethodSig::new("Describe", ValueType::Str), |_, _| {
                Ok(Value::from("shape"))
            })
            .build()
    }

    #[test]
    fn test_signature_ref_positions() {
        let sig = MethodSig::new("Split", ValueType::Int)
            .param(Param::new("a", ValueType::Int))
            .param(Param::by_ref("b", ValueType::Int))
            .param(Param::out("c", ValueType::Str));

        assert_eq!(sig.arity(), 3);
        assert_eq!(sig.ref_count(), 2);
        assert_eq!(sig.ref_positions().collect::<Vec<_>>(), vec![1, 2]);
        assert!(!sig.returns_void());
    }

    #[test]
    fn test_check_args_arity_and_coercion() {
        let sig = MethodSig::new("Scale", ValueType::Void).param(Param::new("f", ValueType::Float));
        let mut args = vec![Value::Int(3)];
        sig.check_args(&mut args).unwrap();
        assert_eq!(args[0], Value::Float(3.0));

        let mut none: Vec<Value> = Vec::new();
        assert!(matches!(sig.check_args(&mut none), Err(HostError::Arity { expected: 1, got: 0, .. })));
    }

    #[test]
    fn test_derive_inherits_fields_and_methods() {
        let base = shape();
        let square = TypeBuilder::derive(&base, "Geo.Square")
            .field("side", ValueType::Float)
            .build();

        assert_eq!(square.fields().len(), 2);
        assert_eq!(square.field("side").map(|(i, _)| i), Some(1));
        assert!(square.method("Area").is_some());
        assert!(square.constructors().is_empty());
        assert!(square.is_subclass_of(&base));
        assert!(!base.is_subclass_of(&square));
    }

    #[test]
    fn test_push_method_replaces_inherited_slot() {
        let base = shape();
        let mut builder = TypeBuilder::derive(&base, "Geo.Circle");
        let def = builder.method_def(MethodSig::new("Area", ValueType::Float), None, true);
        builder.push_method(def);
        let circle = builder.build();

        assert_eq!(circle.methods().len(), base.methods().len());
        assert_eq!(circle.method("Area").unwrap().declaring_type, "Geo.Circle");
        assert_eq!(circle.virtual_methods().count(), 1);
    }

    #[test]
    fn test_static_methods() {
        let ty = TypeBuilder::new("Tests.LoadMe")
            .static_method(MethodSig::new("ReturnOne", ValueType::Int), |_| Ok(Value::Int(1)))
            .build();

        assert_eq!(ty.invoke_static("ReturnOne", &mut []).unwrap(), Value::Int(1));
        assert!(matches!(
            ty.invoke_static("Missing", &mut []),
            Err(HostError::UnknownMember { .. })
        ));
    }
}
