//! Host fixture types shared by the engine integration tests

#![allow(dead_code)]

use std::sync::Arc;

use moonspeak_engine::{EnvConfig, FileResolver, ResolverChain, ScriptEnv, TypeHandle, TypeResolver};
use moonspeak_sdk::{
    HostObject, MethodSig, ObjectRef, Param, TypeBuilder, TypeCatalog, TypeDomain, TypeRef, Value,
    ValueType,
};

/// Abstract base with one virtual method per ref/out shape
pub fn override_me() -> TypeRef {
    TypeBuilder::new("Tests.OverrideMe")
        .as_abstract()
        .default_constructor()
        .field("n", ValueType::Int)
        .virtual_method(MethodSig::new("ReturnOne", ValueType::Int), |_, _| Ok(Value::Int(1)))
        .virtual_method(MethodSig::new("SimpleMethod", ValueType::Int), |_, _| Ok(Value::Int(1)))
        .virtual_method(
            MethodSig::new("MethodWithParams", ValueType::Str)
                .param(Param::new("i", ValueType::Int))
                .param(Param::new("s", ValueType::Str)),
            |_, _| Ok(Value::from("base")),
        )
        .virtual_method(MethodSig::new("Touch", ValueType::Void), |this, _| {
            this.set_field("n", Value::Int(99))?;
            Ok(Value::Null)
        })
        .virtual_method(
            MethodSig::new("IntWithRef", ValueType::Int).param(Param::by_ref("i", ValueType::Int)),
            |_, args| Ok(args[0].clone()),
        )
        .virtual_method(
            MethodSig::new("VoidWithRef", ValueType::Void).param(Param::by_ref("i", ValueType::Int)),
            |_, args| {
                args[0] = Value::Int(1);
                Ok(Value::Null)
            },
        )
        .virtual_method(
            MethodSig::new("IntWithRefAndOut", ValueType::Int)
                .param(Param::by_ref("i", ValueType::Int))
                .param(Param::out("s", ValueType::Str)),
            |_, args| {
                args[1] = Value::from("base");
                Ok(args[0].clone())
            },
        )
        .virtual_method(
            MethodSig::new("VoidWithRefAndOut", ValueType::Void)
                .param(Param::by_ref("i", ValueType::Int))
                .param(Param::out("s", ValueType::Str)),
            |_, args| {
                args[1] = Value::from("base");
                Ok(Value::Null)
            },
        )
        .abstract_method(MethodSig::new("Speak", ValueType::Str))
        .method(MethodSig::new("Describe", ValueType::Str), |_, _| Ok(Value::from("OverrideMe")))
        .build()
}

/// Type with a static method, for `require` tests
pub fn load_me() -> TypeRef {
    TypeBuilder::new("Tests.LoadMe")
        .static_method(MethodSig::new("ReturnOne", ValueType::Int), |_| Ok(Value::Int(1)))
        .static_method(
            MethodSig::new("Square", ValueType::Void).param(Param::by_ref("i", ValueType::Int)),
            |args| {
                let i = args[0].as_i32().unwrap_or(0);
                args[0] = Value::Int(i * i);
                Ok(Value::Null)
            },
        )
        .build()
}

/// Concrete base whose constructor takes a parameter
pub fn counter() -> TypeRef {
    TypeBuilder::new("Tests.Counter")
        .field("count", ValueType::Long)
        .constructor(vec![Param::new("start", ValueType::Int)], |this, args| {
            this.set_field("count", args[0].clone())
        })
        .virtual_method(MethodSig::new("Next", ValueType::Long), |this, _| {
            let next = this.get_field("count")?.as_i64().unwrap_or(0) + 1;
            this.set_field("count", Value::Long(next))?;
            Ok(Value::Long(next))
        })
        .build()
}

/// Abstract base without any constructor
pub fn no_ctor() -> TypeRef {
    TypeBuilder::new("Tests.NoCtor")
        .as_abstract()
        .virtual_method(MethodSig::new("Value", ValueType::Int), |_, _| Ok(Value::Int(7)))
        .build()
}

pub fn test_catalog() -> TypeCatalog {
    TypeCatalog::new("tests")
        .with(override_me())
        .with(load_me())
        .with(counter())
        .with(no_ctor())
}

pub fn test_domain() -> Arc<TypeDomain> {
    Arc::new(TypeDomain::new().with_catalog(test_catalog()))
}

/// Environment that resolves the fixture types
pub fn type_env() -> ScriptEnv {
    env_with(EnvConfig::new("tests"), None)
}

/// Environment with an optional file root ahead of the type resolver
pub fn env_with(config: EnvConfig, files: Option<FileResolver>) -> ScriptEnv {
    let mut chain = ResolverChain::new();
    if let Some(files) = files {
        chain.push(Arc::new(files));
    }
    chain.push(Arc::new(TypeResolver::new(test_domain())));
    ScriptEnv::new(config, chain)
}

/// Evaluate a script that returns a type handle
pub fn define(env: &ScriptEnv, source: &str) -> TypeRef {
    env.eval(source)
        .unwrap()
        .try_cast::<TypeHandle>()
        .expect("script did not return a type")
        .into_inner()
}

pub fn new_instance(ty: &TypeRef) -> ObjectRef {
    HostObject::construct(ty, &mut []).unwrap()
}

pub fn call(object: &ObjectRef, name: &str, args: &mut [Value]) -> Value {
    HostObject::invoke(object, name, args).unwrap()
}
