//! Host values and their declared types
//!
//! `Value` is what flows through host method calls, constructor calls and
//! typed field slots. `ValueType` is what signatures and fields declare.

use std::fmt;
use std::sync::Arc;

use crate::error::{HostError, HostResult};
use crate::object::ObjectRef;
use crate::types::TypeRef;

// ============================================================================
// ValueType
// ============================================================================

/// Declared type of a parameter, return slot or field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// No value (return type only)
    Void,
    /// Boolean
    Bool,
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// 64-bit float
    Float,
    /// String (reference-kinded, may be null)
    Str,
    /// Any host object (reference-kinded, may be null)
    Object,
    /// A host type reference (reference-kinded, may be null)
    Type,
    /// Untyped slot, accepts every value
    Any,
}

impl ValueType {
    /// Short name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Void => "void",
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Long => "long",
            ValueType::Float => "float",
            ValueType::Str => "string",
            ValueType::Object => "object",
            ValueType::Type => "type",
            ValueType::Any => "any",
        }
    }

    /// Whether `null` is a legal value of this type
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            ValueType::Str | ValueType::Object | ValueType::Type | ValueType::Any
        )
    }

    /// Default-initialized value (what an unassigned field or `out` local holds)
    pub fn default_value(&self) -> Value {
        match self {
            ValueType::Bool => Value::Bool(false),
            ValueType::Int => Value::Int(0),
            ValueType::Long => Value::Long(0),
            ValueType::Float => Value::Float(0.0),
            ValueType::Void
            | ValueType::Str
            | ValueType::Object
            | ValueType::Type
            | ValueType::Any => Value::Null,
        }
    }

    /// Convert `value` into this type without losing information.
    ///
    /// Used for typed field writes and argument checks. Fails with
    /// `HostError::TypeMismatch` when no lossless conversion exists.
    pub fn coerce(&self, value: Value) -> HostResult<Value> {
        let coerced = match (self, value) {
            (ValueType::Any, v) => Some(v),
            (ValueType::Void, _) => Some(Value::Null),
            (t, Value::Null) if t.is_reference() => Some(Value::Null),
            (ValueType::Bool, v @ Value::Bool(_)) => Some(v),
            (ValueType::Int, v @ Value::Int(_)) => Some(v),
            (ValueType::Int, Value::Long(l)) => i32::try_from(l).ok().map(Value::Int),
            (ValueType::Long, Value::Int(i)) => Some(Value::Long(i64::from(i))),
            (ValueType::Long, v @ Value::Long(_)) => Some(v),
            (ValueType::Float, Value::Int(i)) => Some(Value::Float(f64::from(i))),
            (ValueType::Float, Value::Long(l)) => Some(Value::Float(l as f64)),
            (ValueType::Float, v @ Value::Float(_)) => Some(v),
            (ValueType::Str, v @ Value::Str(_)) => Some(v),
            (ValueType::Object, v @ Value::Object(_)) => Some(v),
            (ValueType::Type, v @ Value::Type(_)) => Some(v),
            (_, other) => {
                return Err(HostError::TypeMismatch {
                    expected: self.name().to_string(),
                    got: other.kind().to_string(),
                })
            }
        };
        coerced.ok_or_else(|| HostError::TypeMismatch {
            expected: self.name().to_string(),
            got: "out-of-range number".to_string(),
        })
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Value
// ============================================================================

/// A host-native value
#[derive(Clone)]
pub enum Value {
    /// Null reference / no value
    Null,
    /// Boolean
    Bool(bool),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// 64-bit float
    Float(f64),
    /// Owned string
    Str(String),
    /// Shared reference to a live host object
    Object(ObjectRef),
    /// Shared reference to a host type
    Type(TypeRef),
}

impl Value {
    /// Kind name used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Object(_) => "object",
            Value::Type(_) => "type",
        }
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i32
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Long(l) => i32::try_from(*l).ok(),
            _ => None,
        }
    }

    /// Get as i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(i64::from(*i)),
            Value::Long(l) => Some(*l),
            _ => None,
        }
    }

    /// Get as f64 (integers widen)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(f64::from(*i)),
            Value::Long(l) => Some(*l as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get as object reference
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Get as type reference
    pub fn as_type(&self) -> Option<&TypeRef> {
        match self {
            Value::Type(t) => Some(t),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Type(a), Value::Type(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Int(i) => write!(f, "Int({})", i),
            Value::Long(l) => write!(f, "Long({})", l),
            Value::Float(x) => write!(f, "Float({})", x),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::Object(o) => write!(f, "Object({})", o.host_type().name()),
            Value::Type(t) => write!(f, "Type({})", t.name()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Value::Long(l)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Value::Object(o)
    }
}

impl From<TypeRef> for Value {
    fn from(t: TypeRef) -> Self {
        Value::Type(t)
    }
}
