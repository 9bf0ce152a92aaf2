//! Integration tests for `require` resolution
//!
//! Exercises the resolver chain end to end: host types, script files,
//! caching and cyclic detection.

mod common;

use std::fs;
use std::path::Path;

use common::{env_with, type_env};
use moonspeak_engine::{BridgeError, EnvConfig, FileResolver, TypeHandle, GLOBALS_NAME};
use rhai::Array;
use tempfile::TempDir;

fn write_script(root: &Path, relative: &str, source: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, source).unwrap();
}

fn file_env(root: &TempDir) -> moonspeak_engine::ScriptEnv {
    env_with(
        EnvConfig::new("files"),
        Some(FileResolver::new("scripts").with_root(root.path())),
    )
}

#[test]
fn test_require_host_type_and_call_static() {
    let env = type_env();
    let result = env
        .eval(r#"let t = require("Tests.LoadMe"); t.invoke("ReturnOne")"#)
        .unwrap();
    assert_eq!(result.as_int(), Ok(1));

    // ref results come back positionally
    let squared = env
        .eval(r#"require("Tests.LoadMe").invoke("Square", [12])"#)
        .unwrap();
    assert_eq!(squared.as_int(), Ok(144));
}

#[test]
fn test_required_types_are_published() {
    let env = type_env();
    env.require("Tests.LoadMe").unwrap();
    assert!(env.globals().has_type("Tests.LoadMe"));

    let same = env
        .eval(&format!(
            r#"{GLOBALS_NAME}.types["Tests.LoadMe"] == require("Tests.LoadMe")"#
        ))
        .unwrap();
    assert_eq!(same.as_bool(), Ok(true));

    let lookups = env
        .eval(&format!(
            r#"[{GLOBALS_NAME}.types.len, type_of({GLOBALS_NAME}.types["Tests.Unpublished"])]"#
        ))
        .unwrap()
        .try_cast::<Array>()
        .unwrap();
    assert_eq!(lookups[0].as_int(), Ok(1));
    assert_eq!(lookups[1].clone().into_string().unwrap(), "()");
}

#[test]
fn test_file_resolver_wins_over_types() {
    let root = TempDir::new().unwrap();
    write_script(root.path(), "Tests/LoadMe.rhai", "\"from file\"");

    let env = file_env(&root);
    let value = env.require("Tests.LoadMe").unwrap();
    assert_eq!(value.into_string().unwrap(), "from file");
    assert!(!env.globals().has_type("Tests.LoadMe"));
}

#[test]
fn test_type_used_when_file_is_missing() {
    let root = TempDir::new().unwrap();
    let env = file_env(&root);
    let value = env.require("Tests.LoadMe").unwrap();
    let handle = value.try_cast::<TypeHandle>().unwrap();
    assert_eq!(handle.host_type().name(), "Tests.LoadMe");
}

#[test]
fn test_modules_are_cached() {
    let root = TempDir::new().unwrap();
    write_script(root.path(), "util.rhai", "print(\"loading util\"); 7");

    let env = file_env(&root);
    assert_eq!(env.require("util").unwrap().as_int(), Ok(7));
    assert!(env.is_loaded("util"));

    fs::remove_file(root.path().join("util.rhai")).unwrap();
    assert_eq!(env.require("util").unwrap().as_int(), Ok(7));

    env.clear_loaded();
    assert!(matches!(env.require("util"), Err(BridgeError::Resolution(_))));
}

#[test]
fn test_nested_module_paths() {
    let root = TempDir::new().unwrap();
    write_script(root.path(), "game/ui/menu.rhai", "[1, 2, 3]");

    let env = file_env(&root);
    let value = env.require("game.ui.menu").unwrap();
    assert_eq!(value.try_cast::<Array>().unwrap().len(), 3);
}

#[test]
fn test_cyclic_require_is_reported() {
    let root = TempDir::new().unwrap();
    write_script(root.path(), "a.rhai", "require(\"b\")");
    write_script(root.path(), "b.rhai", "require(\"a\")");

    let env = file_env(&root);
    let err = env.require("a").unwrap_err();
    assert!(err.to_string().contains("cyclic require of module 'a'"), "{err}");
    assert!(!env.is_loaded("a"));
    assert!(!env.is_loaded("b"));
}

#[test]
fn test_missing_module() {
    let env = type_env();
    assert!(matches!(env.require("Nope.Nothing"), Err(BridgeError::Resolution(name)) if name == "Nope.Nothing"));

    let caught = env
        .eval(r#"let r = 0; try { require("Nope.Nothing"); } catch (err) { r = 1; } r"#)
        .unwrap();
    assert_eq!(caught.as_int(), Ok(1));
}

#[test]
fn test_modules_share_function_library() {
    let root = TempDir::new().unwrap();
    write_script(root.path(), "helpers.rhai", "fn triple(x) { x * 3 }");

    let env = file_env(&root);
    env.require("helpers").unwrap();
    assert_eq!(env.eval("triple(5)").unwrap().as_int(), Ok(15));
}

#[test]
fn test_module_defines_class_with_base() {
    let root = TempDir::new().unwrap();
    write_script(
        root.path(),
        "Mods/Answer.rhai",
        r#"class("Mods.Answer", require("Tests.OverrideMe"), #{ ReturnOne: |me| 42 })"#,
    );

    let env = file_env(&root);
    let ty = env
        .require("Mods.Answer")
        .unwrap()
        .try_cast::<TypeHandle>()
        .unwrap()
        .into_inner();
    let obj = common::new_instance(&ty);
    assert_eq!(common::call(&obj, "ReturnOne", &mut []), moonspeak_sdk::Value::Int(42));
    assert_eq!(env.types().type_names(), vec!["Mods.Answer".to_string()]);
}
