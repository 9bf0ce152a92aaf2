//! Script-callable API
//!
//! Registers the bridge with a Rhai engine:
//!
//! - `class(name, base, overrides [, configurator])` synthesizes or reloads
//!   a type and returns its `HostType` handle
//! - `typeof(value)` returns the host type of a value
//! - `require(name)` loads a module through the resolver chain
//! - `HostObject` member access (`obj.field`, `obj["field"]`) and
//!   `obj.invoke(name [, args])`
//! - `HostType` `invoke(name [, args])` for static methods and
//!   `create([args])` for construction
//! - `HostMethod` `invoke([args])`
//! - `ClassBuilder` `expose(name, arity)`
//!
//! Host methods with `ref`/`out` parameters return their results using the
//! same positional convention overrides use.

use moonspeak_sdk::{primitive_type, HostError, HostObject, ObjectRef, TypeRef, Value, ValueType};
use rhai::{Array, Dynamic, Engine, FnPtr, ImmutableString, Map, INT};

use crate::env::WeakEnv;
use crate::error::{BridgeError, BridgeResult, MarshalError, ScriptResult};
use crate::globals::{PublishedTypes, ScriptGlobals};
use crate::handles::{BoundMethod, ObjectHandle, TypeHandle};
use crate::instance::InstanceState;
use crate::maker::{self, ClassBuilder};
use crate::marshal;
use crate::registry::OverrideTable;

pub(crate) fn register(engine: &mut Engine, env: WeakEnv) {
    register_types(engine);
    register_objects(engine, &env);
    register_host_types(engine);
    register_entry_points(engine, &env);
}

fn register_types(engine: &mut Engine) {
    engine
        .register_type_with_name::<TypeHandle>("HostType")
        .register_type_with_name::<ObjectHandle>("HostObject")
        .register_type_with_name::<BoundMethod>("HostMethod")
        .register_type_with_name::<ClassBuilder>("ClassBuilder")
        .register_type_with_name::<ScriptGlobals>("ScriptGlobals")
        .register_type_with_name::<PublishedTypes>("TypeTable");

    engine.register_get("types", |globals: &mut ScriptGlobals| globals.types());
    engine.register_indexer_get(|table: &mut PublishedTypes, name: ImmutableString| -> Dynamic {
        table.get(&name).map_or(Dynamic::UNIT, Dynamic::from)
    });
    engine.register_get("len", |table: &mut PublishedTypes| table.len() as INT);

    engine
        .register_fn("to_string", |h: &mut TypeHandle| h.to_string())
        .register_fn("to_debug", |h: &mut TypeHandle| format!("{h:?}"))
        .register_fn("to_string", |h: &mut ObjectHandle| h.to_string())
        .register_fn("to_debug", |h: &mut ObjectHandle| format!("{h:?}"))
        .register_fn("to_string", |m: &mut BoundMethod| format!("{m:?}"))
        .register_fn("==", |a: TypeHandle, b: TypeHandle| a == b)
        .register_fn("!=", |a: TypeHandle, b: TypeHandle| a != b)
        .register_fn("==", |a: ObjectHandle, b: ObjectHandle| a == b)
        .register_fn("!=", |a: ObjectHandle, b: ObjectHandle| a != b);
}

// ============================================================================
// Objects
// ============================================================================

fn register_objects(engine: &mut Engine, env: &WeakEnv) {
    engine.register_indexer_get(
        |h: &mut ObjectHandle, name: ImmutableString| -> ScriptResult<Dynamic> {
            h.get(&name).map_err(BridgeError::into_script)
        },
    );
    engine.register_indexer_set(
        |h: &mut ObjectHandle, name: ImmutableString, value: Dynamic| -> ScriptResult<()> {
            h.try_set(&name, value).map_err(BridgeError::into_script)
        },
    );

    let weak = env.clone();
    engine.register_fn(
        "invoke",
        move |h: &mut ObjectHandle, name: ImmutableString| -> ScriptResult<Dynamic> {
            invoke_object(&weak, h, &name, Array::new()).map_err(BridgeError::into_script)
        },
    );
    let weak = env.clone();
    engine.register_fn(
        "invoke",
        move |h: &mut ObjectHandle, name: ImmutableString, args: Array| -> ScriptResult<Dynamic> {
            invoke_object(&weak, h, &name, args).map_err(BridgeError::into_script)
        },
    );

    engine.register_fn("invoke", |m: &mut BoundMethod| -> ScriptResult<Dynamic> {
        invoke_method(m.object(), m.name(), Array::new()).map_err(BridgeError::into_script)
    });
    engine.register_fn("invoke", |m: &mut BoundMethod, args: Array| -> ScriptResult<Dynamic> {
        invoke_method(m.object(), m.name(), args).map_err(BridgeError::into_script)
    });
}

/// Call a member on an object from script code.
///
/// Callables in the instance store and registry-only helpers are called
/// directly with `me` first; host methods (overridden or not) go through
/// the method table with full marshalling.
fn invoke_object(env: &WeakEnv, handle: &ObjectHandle, name: &str, args: Array) -> BridgeResult<Dynamic> {
    let object = handle.object();
    if let Some(state) = InstanceState::of(object) {
        let callable = state
            .stored(name)
            .and_then(|value| value.try_cast::<FnPtr>())
            .or_else(|| {
                object
                    .host_type()
                    .method(name)
                    .is_none()
                    .then(|| state.registry().get(name))
                    .flatten()
            });
        if let Some(callable) = callable {
            let mut argv = Vec::with_capacity(args.len() + 1);
            argv.push(Dynamic::from(handle.clone()));
            argv.extend(args);
            return env.get()?.call(&callable, argv);
        }
    }
    invoke_method(object, name, args)
}

fn invoke_method(object: &ObjectRef, name: &str, args: Array) -> BridgeResult<Dynamic> {
    let ty = object.host_type();
    let method = ty.method(name).ok_or_else(|| unknown(ty, name))?;
    let sig = method.sig.clone();
    let mut values = marshal::args_from_script(name, &sig.params, args)?;
    let ret = HostObject::invoke(object, name, &mut values)?;
    Ok(marshal::pack_results(&sig, &ret, &values))
}

fn unknown(ty: &TypeRef, name: &str) -> BridgeError {
    BridgeError::Host(HostError::UnknownMember {
        type_name: ty.name().to_string(),
        member: name.to_string(),
    })
}

// ============================================================================
// Types
// ============================================================================

fn register_host_types(engine: &mut Engine) {
    engine.register_get("name", |h: &mut TypeHandle| h.host_type().name().to_string());
    engine.register_fn("is_subclass_of", |h: &mut TypeHandle, other: TypeHandle| {
        h.host_type().is_subclass_of(other.host_type())
    });

    engine.register_fn("invoke", |h: &mut TypeHandle, name: ImmutableString| -> ScriptResult<Dynamic> {
        invoke_static(h.host_type(), &name, Array::new()).map_err(BridgeError::into_script)
    });
    engine.register_fn(
        "invoke",
        |h: &mut TypeHandle, name: ImmutableString, args: Array| -> ScriptResult<Dynamic> {
            invoke_static(h.host_type(), &name, args).map_err(BridgeError::into_script)
        },
    );

    engine.register_fn("create", |h: &mut TypeHandle| -> ScriptResult<ObjectHandle> {
        create(h.host_type(), Array::new()).map_err(BridgeError::into_script)
    });
    engine.register_fn("create", |h: &mut TypeHandle, args: Array| -> ScriptResult<ObjectHandle> {
        create(h.host_type(), args).map_err(BridgeError::into_script)
    });

    engine.register_fn(
        "expose",
        |b: &mut ClassBuilder, name: ImmutableString, arity: INT| -> ScriptResult<()> {
            let arity = usize::try_from(arity).map_err(|_| {
                BridgeError::Script(format!("invalid arity {arity} for '{name}'")).into_script()
            })?;
            b.expose(name.as_str(), arity);
            Ok(())
        },
    );
}

fn invoke_static(ty: &TypeRef, name: &str, args: Array) -> BridgeResult<Dynamic> {
    let method = ty.static_method(name).ok_or_else(|| unknown(ty, name))?;
    let sig = method.sig.clone();
    let mut values = marshal::args_from_script(name, &sig.params, args)?;
    let ret = ty.invoke_static(name, &mut values)?;
    Ok(marshal::pack_results(&sig, &ret, &values))
}

fn create(ty: &TypeRef, args: Array) -> BridgeResult<ObjectHandle> {
    let ctor = ty.constructors().iter().find(|c| c.params.len() == args.len());
    let mut values = match ctor {
        Some(ctor) => marshal::args_from_script(ty.name(), &ctor.params, args)?,
        // construct reports the arity or constructibility problem
        None => vec![Value::Null; args.len()],
    };
    let object = HostObject::construct(ty, &mut values)?;
    Ok(ObjectHandle::new(object))
}

// ============================================================================
// Entry points
// ============================================================================

fn register_entry_points(engine: &mut Engine, env: &WeakEnv) {
    let weak = env.clone();
    engine.register_fn(
        "class",
        move |name: ImmutableString, base: TypeHandle, overrides: Map| -> ScriptResult<TypeHandle> {
            define_class(&weak, &name, &base, overrides, None).map_err(BridgeError::into_script)
        },
    );
    let weak = env.clone();
    engine.register_fn(
        "class",
        move |name: ImmutableString,
              base: TypeHandle,
              overrides: Map,
              configurator: FnPtr|
              -> ScriptResult<TypeHandle> {
            define_class(&weak, &name, &base, overrides, Some(&configurator))
                .map_err(BridgeError::into_script)
        },
    );

    engine.register_fn("typeof", |value: Dynamic| -> ScriptResult<TypeHandle> {
        type_of(&value).map_err(BridgeError::into_script)
    });

    let weak = env.clone();
    engine.register_fn("require", move |name: ImmutableString| -> ScriptResult<Dynamic> {
        weak.get()
            .and_then(|env| env.require(&name))
            .map_err(BridgeError::into_script)
    });
}

fn define_class(
    env: &WeakEnv,
    name: &str,
    base: &TypeHandle,
    overrides: Map,
    configurator: Option<&FnPtr>,
) -> BridgeResult<TypeHandle> {
    let env = env.get()?;
    let ty = maker::make_type(
        &env,
        base.host_type(),
        name,
        OverrideTable::from_map(overrides),
        configurator,
    )?;
    Ok(TypeHandle::new(ty))
}

/// Host type of a script value; a type handle is its own type
pub fn type_of(value: &Dynamic) -> BridgeResult<TypeHandle> {
    if let Some(handle) = value.clone().try_cast::<TypeHandle>() {
        return Ok(handle);
    }
    if let Some(handle) = value.clone().try_cast::<ObjectHandle>() {
        return Ok(TypeHandle::new(handle.object().host_type().clone()));
    }

    let primitive = if value.is_bool() {
        Some(ValueType::Bool)
    } else if value.is_int() {
        Some(ValueType::Long)
    } else if value.is_float() {
        Some(ValueType::Float)
    } else if value.is_string() {
        Some(ValueType::Str)
    } else {
        None
    };
    primitive
        .and_then(primitive_type)
        .map(TypeHandle::new)
        .ok_or_else(|| {
            BridgeError::Marshal(MarshalError {
                expected: ValueType::Type,
                got: marshal::script_kind(value),
            })
        })
}
