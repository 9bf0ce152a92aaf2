//! Generated method bodies
//!
//! Every synthesized method is a closure over the type's `TypeStatics`.
//! Overrides are looked up in the registry on each call, so a reload is
//! visible to the very next call on any instance.

use std::sync::Arc;

use moonspeak_sdk::{
    ConstructorDef, CtorFn, HostError, HostResult, MethodDef, MethodFn, MethodSig, ObjectRef, Param,
    TypeBuilder, Value, ValueType,
};
use rhai::{Dynamic, FnPtr};

use crate::error::BridgeResult;
use crate::handles::ObjectHandle;
use crate::instance::InstanceState;
use crate::marshal;
use crate::registry::CONSTRUCTOR_KEY;

use super::{ExposedMethod, TypeStatics};

/// Prefix of the methods that always run the base implementation
pub const BASE_PREFIX: &str = "base_";

/// Run an override: `me` first, then every parameter's current value;
/// the result is unpacked onto the return value and `ref`/`out` slots
pub fn call_override(
    statics: &TypeStatics,
    callable: &FnPtr,
    sig: &MethodSig,
    this: &ObjectRef,
    args: &mut [Value],
) -> BridgeResult<Value> {
    let env = statics.env()?;
    attach_state(this, statics);

    let mut argv = Vec::with_capacity(args.len() + 1);
    argv.push(Dynamic::from(ObjectHandle::new(this.clone())));
    argv.extend(
        sig.params
            .iter()
            .zip(args.iter())
            .map(|(param, value)| marshal::to_script(value, param.ty)),
    );

    let result = env.call(callable, argv)?;
    Ok(marshal::unpack_results(sig, result, args)?)
}

/// Instance state is bound to the registry of the object's own type, which
/// differs from `statics` when a script type derives from another one
fn attach_state(this: &ObjectRef, statics: &TypeStatics) {
    let registry = TypeStatics::of(this.host_type()).map_or(statics.registry(), |own| own.registry());
    InstanceState::attach(this, registry);
}

/// `base_<m>`: the base body of `m` under a new name
pub(crate) fn base_caller(builder: &TypeBuilder, method: &MethodDef) -> MethodDef {
    let sig = method.sig.renamed(format!("{BASE_PREFIX}{}", method.sig.name));
    builder.method_def(sig, method.body.clone(), false)
}

/// `m`: dispatch to the registry entry, or fall through to the base body
pub(crate) fn override_method(builder: &TypeBuilder, method: &MethodDef, statics: &Arc<TypeStatics>) -> MethodDef {
    let sig = method.sig.clone();
    let base_body = method.body.clone();
    let base_type = method.declaring_type.clone();
    let statics = statics.clone();

    let body: MethodFn = {
        let sig = sig.clone();
        Arc::new(move |this: &ObjectRef, args: &mut [Value]| -> HostResult<Value> {
            let Some(callable) = statics.registry().get(&sig.name) else {
                return match &base_body {
                    Some(body) => body(this, args),
                    None => Err(HostError::AbstractMethod {
                        type_name: base_type.clone(),
                        method: sig.name.clone(),
                    }),
                };
            };
            call_override(&statics, &callable, &sig, this, args).map_err(HostError::from)
        })
    };
    builder.method_def(sig.as_ref().clone(), Some(body), true)
}

/// Constructor mirroring `base` (or a default constructor): base body,
/// then instance state, then the `__new` hook if registered
pub(crate) fn constructor(base: Option<&ConstructorDef>, statics: &Arc<TypeStatics>) -> ConstructorDef {
    let params: Vec<Param> = base.map(|c| c.params.clone()).unwrap_or_default();
    let base_body = base.and_then(|c| c.body.clone());
    let sig = Arc::new(MethodSig {
        name: CONSTRUCTOR_KEY.to_string(),
        params: params.clone(),
        ret: ValueType::Void,
    });
    let statics = statics.clone();

    let body: CtorFn = Arc::new(move |this: &ObjectRef, args: &mut [Value]| -> HostResult<()> {
        if let Some(body) = &base_body {
            body(this, args)?;
        }
        attach_state(this, &statics);
        if let Some(hook) = statics.registry().get(CONSTRUCTOR_KEY) {
            call_override(&statics, &hook, &sig, this, args)?;
        }
        Ok(())
    });
    ConstructorDef {
        params,
        body: Some(body),
    }
}

/// Host-visible method added by a configurator; parameters and result are
/// untyped
pub(crate) fn exposed_method(builder: &TypeBuilder, exposed: &ExposedMethod, statics: &Arc<TypeStatics>) -> MethodDef {
    let sig = (0..exposed.arity).fold(MethodSig::new(exposed.name.clone(), ValueType::Any), |sig, i| {
        sig.param(Param::new(format!("arg{i}"), ValueType::Any))
    });
    let type_name = builder.name().to_string();
    let statics = statics.clone();
    let call_sig = Arc::new(sig.clone());

    let body: MethodFn = Arc::new(move |this: &ObjectRef, args: &mut [Value]| -> HostResult<Value> {
        let callable = statics
            .registry()
            .get(&call_sig.name)
            .ok_or_else(|| HostError::UnknownMember {
                type_name: type_name.clone(),
                member: call_sig.name.clone(),
            })?;
        call_override(&statics, &callable, &call_sig, this, args).map_err(HostError::from)
    });
    builder.method_def(sig, Some(body), true)
}
