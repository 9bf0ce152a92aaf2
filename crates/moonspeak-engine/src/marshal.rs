//! Script value bridge
//!
//! Conversions between host `Value`s and Rhai `Dynamic`s, plus the
//! positional convention that maps one script result onto a method's
//! return value and its `ref`/`out` parameters:
//!
//! - no `ref`/`out` parameters: the result is the return value
//! - one `ref`/`out` parameter and a `void` return: the result is that
//!   parameter's new value
//! - otherwise: the result is a sequence; the return value comes first
//!   (when not `void`), then each `ref`/`out` parameter left to right
//!
//! A non-array result in sequence position counts as a one-element
//! sequence. Missing slots are `()`.

use moonspeak_sdk::{HostError, MethodSig, Param, ParamDirection, Value, ValueType};
use rhai::{Array, Dynamic, FLOAT, INT};

use crate::error::{BridgeError, MarshalError};
use crate::handles::{BoundMethod, ObjectHandle, TypeHandle};

/// Convert a host value for a slot declared as `declared`
pub fn to_script(value: &Value, declared: ValueType) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Bool(b) => Dynamic::from_bool(*b),
        Value::Int(i) if declared == ValueType::Float => Dynamic::from_float(FLOAT::from(*i)),
        Value::Int(i) => Dynamic::from_int(INT::from(*i)),
        Value::Long(l) if declared == ValueType::Float => Dynamic::from_float(*l as FLOAT),
        Value::Long(l) => Dynamic::from_int(*l as INT),
        Value::Float(f) => Dynamic::from_float(*f as FLOAT),
        Value::Str(s) => Dynamic::from(s.clone()),
        Value::Object(o) => Dynamic::from(ObjectHandle::new(o.clone())),
        Value::Type(t) => Dynamic::from(TypeHandle::new(t.clone())),
    }
}

/// Convert a script value into a host slot of type `target`
pub fn from_script(value: &Dynamic, target: ValueType) -> Result<Value, MarshalError> {
    let converted = match target {
        ValueType::Void => Some(Value::Null),
        ValueType::Any => any_value(value),
        ValueType::Bool => value.as_bool().ok().map(Value::Bool),
        ValueType::Int => integral(value)
            .and_then(|i| i32::try_from(i).ok())
            .map(Value::Int),
        ValueType::Long => integral(value).map(Value::Long),
        ValueType::Float => value
            .as_float()
            .ok()
            .map(|f| f as f64)
            .or_else(|| value.as_int().ok().map(|i| i as f64))
            .map(Value::Float),
        ValueType::Str if value.is_unit() => Some(Value::Null),
        ValueType::Str => value.clone().into_string().ok().map(Value::Str),
        ValueType::Object if value.is_unit() => Some(Value::Null),
        ValueType::Object => value
            .clone()
            .try_cast::<ObjectHandle>()
            .map(|h| Value::Object(h.into_inner())),
        ValueType::Type if value.is_unit() => Some(Value::Null),
        ValueType::Type => value
            .clone()
            .try_cast::<TypeHandle>()
            .map(|h| Value::Type(h.into_inner())),
    };
    converted.ok_or_else(|| MarshalError {
        expected: target,
        got: script_kind(value),
    })
}

fn integral(value: &Dynamic) -> Option<i64> {
    if let Ok(i) = value.as_int() {
        return Some(i as i64);
    }
    let f = value.as_float().ok()? as f64;
    (f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64).then_some(f as i64)
}

fn any_value(value: &Dynamic) -> Option<Value> {
    if value.is_unit() {
        return Some(Value::Null);
    }
    if let Ok(b) = value.as_bool() {
        return Some(Value::Bool(b));
    }
    if let Ok(i) = value.as_int() {
        return Some(Value::Long(i as i64));
    }
    if let Ok(f) = value.as_float() {
        return Some(Value::Float(f as f64));
    }
    if value.is_string() {
        return value.clone().into_string().ok().map(Value::Str);
    }
    if let Some(h) = value.clone().try_cast::<ObjectHandle>() {
        return Some(Value::Object(h.into_inner()));
    }
    value
        .clone()
        .try_cast::<TypeHandle>()
        .map(|h| Value::Type(h.into_inner()))
}

/// Kind name of a script value, for diagnostics
pub fn script_kind(value: &Dynamic) -> String {
    if value.is::<ObjectHandle>() {
        "HostObject".to_string()
    } else if value.is::<TypeHandle>() {
        "HostType".to_string()
    } else if value.is::<BoundMethod>() {
        "HostMethod".to_string()
    } else {
        value.type_name().to_string()
    }
}

// ============================================================================
// Call results
// ============================================================================

/// Apply a script call result to a method's return value and `ref`/`out`
/// slots.
///
/// Every slot is converted before any is written, so a failed conversion
/// leaves `args` untouched.
pub fn unpack_results(sig: &MethodSig, result: Dynamic, args: &mut [Value]) -> Result<Value, MarshalError> {
    let refs: Vec<usize> = sig.ref_positions().collect();
    let is_void = sig.returns_void();

    match (refs.as_slice(), is_void) {
        ([], _) => from_script(&result, sig.ret),
        ([pos], true) => {
            let value = from_script(&result, sig.params[*pos].ty)?;
            args[*pos] = value;
            Ok(Value::Null)
        }
        _ => {
            let mut slots = into_sequence(result).into_iter();
            let ret = if is_void {
                Value::Null
            } else {
                from_script(&slots.next().unwrap_or(Dynamic::UNIT), sig.ret)?
            };
            let mut writes = Vec::with_capacity(refs.len());
            for &pos in &refs {
                let slot = slots.next().unwrap_or(Dynamic::UNIT);
                writes.push((pos, from_script(&slot, sig.params[pos].ty)?));
            }
            for (pos, value) in writes {
                args[pos] = value;
            }
            Ok(ret)
        }
    }
}

/// Shape a host call's return value and `ref`/`out` slots into one script
/// value, using the same positional convention as `unpack_results`
pub fn pack_results(sig: &MethodSig, ret: &Value, args: &[Value]) -> Dynamic {
    let refs: Vec<usize> = sig.ref_positions().collect();
    match (refs.as_slice(), sig.returns_void()) {
        ([], _) => to_script(ret, sig.ret),
        ([pos], true) => to_script(&args[*pos], sig.params[*pos].ty),
        (_, is_void) => {
            let mut packed = Array::with_capacity(refs.len() + 1);
            if !is_void {
                packed.push(to_script(ret, sig.ret));
            }
            packed.extend(
                refs.iter()
                    .map(|&pos| to_script(&args[pos], sig.params[pos].ty)),
            );
            Dynamic::from_array(packed)
        }
    }
}

fn into_sequence(result: Dynamic) -> Array {
    if result.is_array() {
        result.try_cast::<Array>().unwrap_or_default()
    } else {
        vec![result]
    }
}

/// Convert script arguments for a host call with the given parameters.
///
/// `()` passed for an `out` parameter becomes that type's default value.
pub fn args_from_script(name: &str, params: &[Param], args: Array) -> Result<Vec<Value>, BridgeError> {
    if params.len() != args.len() {
        return Err(BridgeError::Host(HostError::Arity {
            name: name.to_string(),
            expected: params.len(),
            got: args.len(),
        }));
    }
    params
        .iter()
        .zip(args.iter())
        .map(|(param, arg)| {
            if param.direction == ParamDirection::Out && arg.is_unit() {
                Ok(param.ty.default_value())
            } else {
                from_script(arg, param.ty).map_err(BridgeError::from)
            }
        })
        .collect()
}
