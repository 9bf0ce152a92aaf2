//! Integration tests for bundle loading and reload

use std::fs;
use std::path::Path;
use std::sync::Arc;

use moonspeak_engine::TypeHandle;
use moonspeak_runtime::{LoadError, Runtime, MANIFEST_FILE};
use moonspeak_sdk::{
    HostObject, MethodSig, Param, TypeBuilder, TypeCatalog, TypeDomain, TypeRef, Value, ValueType,
};
use tempfile::TempDir;

fn weapon() -> TypeRef {
    TypeBuilder::new("Game.Weapon")
        .as_abstract()
        .default_constructor()
        .field("ammo", ValueType::Int)
        .virtual_method(MethodSig::new("Damage", ValueType::Int), |_, _| Ok(Value::Int(1)))
        .virtual_method(
            MethodSig::new("Fire", ValueType::Bool).param(Param::by_ref("shots", ValueType::Int)),
            |_, args| {
                args[0] = Value::Int(0);
                Ok(Value::Bool(false))
            },
        )
        .build()
}

fn runtime() -> Runtime {
    let domain = TypeDomain::new().with_catalog(TypeCatalog::new("game").with(weapon()));
    Runtime::new(Arc::new(domain))
}

fn write(root: &Path, relative: &str, source: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, source).unwrap();
}

fn instance_of(runtime: &Runtime, name: &str) -> moonspeak_sdk::ObjectRef {
    let ty = runtime.domain().find_type(name).unwrap();
    HostObject::construct(&ty, &mut []).unwrap()
}

const PISTOL: &str = r#"
class("Mods.Pistol", require("Game.Weapon"), #{
    Damage: |me| 10,
    Fire: |me, shots| [true, shots - 1]
})
"#;

#[test]
fn test_bundle_exports_types() {
    let runtime = runtime();
    let root = TempDir::new().unwrap();
    write(root.path(), "scripts/main.rhai", PISTOL);

    runtime.load_bundle("mods", root.path()).unwrap();

    let pistol = instance_of(&runtime, "Mods.Pistol");
    assert_eq!(HostObject::invoke(&pistol, "Damage", &mut []).unwrap(), Value::Int(10));

    let mut args = [Value::Int(6)];
    assert_eq!(HostObject::invoke(&pistol, "Fire", &mut args).unwrap(), Value::Bool(true));
    assert_eq!(args[0], Value::Int(5));
}

#[test]
fn test_later_bundle_derives_from_exported_type() {
    let runtime = runtime();
    let first = TempDir::new().unwrap();
    write(first.path(), "scripts/main.rhai", PISTOL);
    runtime.load_bundle("mods", first.path()).unwrap();

    let second = TempDir::new().unwrap();
    write(
        second.path(),
        "scripts/main.rhai",
        r#"
        class("Extra.Magnum", require("Mods.Pistol"), #{
            Damage: |me| me.invoke("base_Damage") * 5
        })
        "#,
    );
    runtime.load_bundle("extra", second.path()).unwrap();

    let magnum = instance_of(&runtime, "Extra.Magnum");
    assert_eq!(HostObject::invoke(&magnum, "Damage", &mut []).unwrap(), Value::Int(50));

    // inherited override from the first bundle
    let mut args = [Value::Int(2)];
    HostObject::invoke(&magnum, "Fire", &mut args).unwrap();
    assert_eq!(args[0], Value::Int(1));

    let ty = magnum.host_type().clone();
    assert!(ty.is_subclass_of(&runtime.domain().find_type("Game.Weapon").unwrap()));
}

#[test]
fn test_reload_updates_live_instances() {
    let runtime = runtime();
    let root = TempDir::new().unwrap();
    write(root.path(), "scripts/main.rhai", PISTOL);
    runtime.load_bundle("mods", root.path()).unwrap();

    let pistol = instance_of(&runtime, "Mods.Pistol");
    let before = runtime.domain().find_type("Mods.Pistol").unwrap();

    write(
        root.path(),
        "scripts/main.rhai",
        r#"class("Mods.Pistol", require("Game.Weapon"), #{ Damage: |me| 25 })"#,
    );
    runtime.reload_bundle("mods").unwrap();

    assert_eq!(HostObject::invoke(&pistol, "Damage", &mut []).unwrap(), Value::Int(25));
    // Fire no longer overridden
    let mut args = [Value::Int(6)];
    assert_eq!(HostObject::invoke(&pistol, "Fire", &mut args).unwrap(), Value::Bool(false));
    assert_eq!(args[0], Value::Int(0));

    let after = runtime.domain().find_type("Mods.Pistol").unwrap();
    assert!(Arc::ptr_eq(&before, &after));
}

#[test]
fn test_failed_reload_keeps_previous_behavior() {
    let runtime = runtime();
    let root = TempDir::new().unwrap();
    write(root.path(), "scripts/main.rhai", PISTOL);
    runtime.load_bundle("mods", root.path()).unwrap();
    let pistol = instance_of(&runtime, "Mods.Pistol");

    write(root.path(), "scripts/main.rhai", "class(");
    assert!(matches!(
        runtime.reload_bundle("mods"),
        Err(LoadError::Bridge { .. })
    ));
    assert_eq!(HostObject::invoke(&pistol, "Damage", &mut []).unwrap(), Value::Int(10));
}

#[test]
fn test_bundle_modules_and_shared_modules() {
    let runtime = runtime();
    let first = TempDir::new().unwrap();
    write(first.path(), "scripts/shared/numbers.rhai", "#{ base: 40 }");
    write(first.path(), "scripts/local.rhai", "2");
    write(
        first.path(),
        "scripts/main.rhai",
        r#"
        let n = require("numbers").base + require("local");
        class("Mods.Rifle", require("Game.Weapon"), #{ Damage: |me| n })
        "#,
    );
    runtime.load_bundle("mods", first.path()).unwrap();
    let rifle = instance_of(&runtime, "Mods.Rifle");
    assert_eq!(HostObject::invoke(&rifle, "Damage", &mut []).unwrap(), Value::Int(42));

    // shared modules of earlier bundles are visible, private ones are not
    let second = TempDir::new().unwrap();
    write(
        second.path(),
        "scripts/main.rhai",
        r#"
        let seen = require("numbers").base;
        let caught = false;
        try { require("local"); } catch (err) { caught = true; }
        if seen != 40 || !caught { throw "shared module visibility"; }
        "#,
    );
    runtime.load_bundle("other", second.path()).unwrap();
}

#[test]
fn test_manifest_moves_entry_and_limits() {
    let runtime = runtime();
    let root = TempDir::new().unwrap();
    write(
        root.path(),
        MANIFEST_FILE,
        r#"
[bundle]
name = "Custom"
entry = "boot.rhai"
script_dir = "src"

[limits]
max_operations = 10000
"#,
    );
    write(root.path(), "src/boot.rhai", "let x = 0; loop { x += 1; }");

    let err = runtime.load_bundle("custom", root.path()).unwrap_err();
    assert!(matches!(err, LoadError::Bridge { .. }));

    write(root.path(), "src/boot.rhai", PISTOL);
    runtime.load_bundle("custom", root.path()).unwrap();
    assert_eq!(runtime.bundle("custom").unwrap().name(), "Custom");
}

#[test]
fn test_bundle_env_is_reachable() {
    let runtime = runtime();
    let root = TempDir::new().unwrap();
    write(root.path(), "scripts/main.rhai", PISTOL);
    runtime.load_bundle("mods", root.path()).unwrap();

    let bundle = runtime.bundle("mods").unwrap();
    let ty = bundle
        .env()
        .eval(r#"typeof(require("Mods.Pistol").create())"#)
        .unwrap()
        .try_cast::<TypeHandle>()
        .unwrap();
    assert_eq!(ty.host_type().name(), "Mods.Pistol");
    assert_eq!(bundle.env().types().type_names(), vec!["Mods.Pistol".to_string()]);
}
