//! Script environment
//!
//! A `ScriptEnv` is one isolated script world: a Rhai engine with the
//! bridge API registered, the function library accumulated from every
//! evaluated source, the `__moonspeak` globals, a resolver chain with its
//! module cache, and the scope of types synthesized by its scripts.
//!
//! Closures registered with the engine and the statics of synthesized types
//! hold a `WeakEnv`, so dropping the last `ScriptEnv` releases everything.
//! No lock is held while script code runs.
//!
//! Every evaluation and host-initiated call counts toward a per-environment
//! depth, bounded by `max_call_levels`. Rhai restarts its own call depth at
//! each host entry, so recursion that goes through generated methods is
//! only bounded here.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use moonspeak_sdk::TypeRef;
use parking_lot::{Mutex, RwLock};
use rhai::{Dynamic, Engine, FnPtr, AST};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info};

use crate::api;
use crate::error::{BridgeError, BridgeResult};
use crate::globals::ScriptGlobals;
use crate::maker::{self, TypeModule};
use crate::registry::OverrideTable;
use crate::resolver::ResolverChain;

/// Log target for script `print` and `debug` output
pub const SCRIPT_LOG_TARGET: &str = "moonspeak::script";

/// Environment options
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Environment id; names the type catalog and tags log output
    pub id: String,
    /// Reject override keys that name no base member
    pub strict_overrides: bool,
    /// Maximum script call depth, and maximum nesting of host-to-script
    /// entries
    pub max_call_levels: usize,
    /// Maximum operations per evaluation (0 = unlimited)
    pub max_operations: u64,
}

impl EnvConfig {
    /// Default options under `id`
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            id: "main".to_string(),
            strict_overrides: false,
            max_call_levels: 64,
            max_operations: 0,
        }
    }
}

struct EnvInner {
    config: EnvConfig,
    engine: Engine,
    library: RwLock<AST>,
    globals: ScriptGlobals,
    resolvers: ResolverChain,
    loaded: RwLock<FxHashMap<String, Dynamic>>,
    loading: Mutex<FxHashSet<String>>,
    types: TypeModule,
    depth: AtomicUsize,
}

/// One level of host-to-script nesting; released on drop
struct DepthGuard<'a>(&'a AtomicUsize);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Shared handle to a script environment
#[derive(Clone)]
pub struct ScriptEnv {
    inner: Arc<EnvInner>,
}

/// Non-owning handle to a script environment
#[derive(Clone)]
pub struct WeakEnv {
    inner: Weak<EnvInner>,
    id: Arc<str>,
}

impl WeakEnv {
    /// Id of the environment
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The environment, if it still exists
    pub fn upgrade(&self) -> Option<ScriptEnv> {
        self.inner.upgrade().map(|inner| ScriptEnv { inner })
    }

    /// The environment, or `EnvironmentDropped`
    pub fn get(&self) -> BridgeResult<ScriptEnv> {
        self.upgrade()
            .ok_or_else(|| BridgeError::EnvironmentDropped(self.id.to_string()))
    }
}

impl ScriptEnv {
    /// Create an environment resolving `require` through `resolvers`
    pub fn new(config: EnvConfig, resolvers: ResolverChain) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<EnvInner>| {
            let mut engine = Engine::new();
            engine.set_max_call_levels(config.max_call_levels);
            if config.max_operations > 0 {
                engine.set_max_operations(config.max_operations);
            }

            let id = config.id.clone();
            engine.on_print(move |text| {
                info!(target: SCRIPT_LOG_TARGET, bundle = %id, "{}", text);
            });
            let id = config.id.clone();
            engine.on_debug(move |text, source, pos| {
                debug!(
                    target: SCRIPT_LOG_TARGET,
                    bundle = %id,
                    source = source.unwrap_or("<eval>"),
                    line = pos.line().unwrap_or(0),
                    "{}",
                    text
                );
            });

            api::register(
                &mut engine,
                WeakEnv {
                    inner: weak.clone(),
                    id: Arc::from(config.id.as_str()),
                },
            );

            EnvInner {
                types: TypeModule::new(config.id.clone()),
                config,
                engine,
                library: RwLock::new(AST::empty()),
                globals: ScriptGlobals::new(),
                resolvers,
                loaded: RwLock::new(FxHashMap::default()),
                loading: Mutex::new(FxHashSet::default()),
                depth: AtomicUsize::new(0),
            }
        });
        Self { inner }
    }

    /// Environment id
    pub fn id(&self) -> &str {
        &self.inner.config.id
    }

    /// Options the environment was created with
    pub fn config(&self) -> &EnvConfig {
        &self.inner.config
    }

    /// Non-owning handle
    pub fn downgrade(&self) -> WeakEnv {
        WeakEnv {
            inner: Arc::downgrade(&self.inner),
            id: Arc::from(self.id()),
        }
    }

    /// The embedded engine
    pub fn engine(&self) -> &Engine {
        &self.inner.engine
    }

    /// `__moonspeak` globals
    pub fn globals(&self) -> &ScriptGlobals {
        &self.inner.globals
    }

    /// Resolver chain behind `require`
    pub fn resolvers(&self) -> &ResolverChain {
        &self.inner.resolvers
    }

    /// Types synthesized in this environment
    pub fn types(&self) -> &TypeModule {
        &self.inner.types
    }

    /// Evaluate a source string
    pub fn eval(&self, source: &str) -> BridgeResult<Dynamic> {
        self.eval_named("<eval>", source)
    }

    /// Evaluate a script file
    pub fn eval_file(&self, path: &Path) -> BridgeResult<Dynamic> {
        let source = std::fs::read_to_string(path).map_err(|source| BridgeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.eval_named(&path.to_string_lossy(), &source)
    }

    /// Compile and run `source`; its function definitions join the library
    /// and it can call every function defined before it
    pub fn eval_named(&self, name: &str, source: &str) -> BridgeResult<Dynamic> {
        let _depth = self.enter()?;
        let ast = self.inner.engine.compile(source)?;
        let mut runnable = {
            let mut library = self.inner.library.write();
            library.combine(ast.clone_functions_only());
            library.merge(&ast)
        };
        runnable.set_source(name);

        let mut scope = self.inner.globals.scope();
        Ok(self.inner.engine.eval_ast_with_scope::<Dynamic>(&mut scope, &runnable)?)
    }

    /// Call a script callable against the accumulated library
    pub fn call(&self, callable: &FnPtr, args: Vec<Dynamic>) -> BridgeResult<Dynamic> {
        let _depth = self.enter()?;
        let library = self.inner.library.read().clone();
        Ok(callable.call::<Dynamic>(&self.inner.engine, &library, args)?)
    }

    /// Current nesting of evaluations and host-initiated calls
    pub fn depth(&self) -> usize {
        self.inner.depth.load(Ordering::SeqCst)
    }

    fn enter(&self) -> BridgeResult<DepthGuard<'_>> {
        let limit = self.inner.config.max_call_levels;
        let depth = self.inner.depth.fetch_add(1, Ordering::SeqCst);
        let guard = DepthGuard(&self.inner.depth);
        if depth >= limit {
            return Err(BridgeError::CallDepth(limit));
        }
        Ok(guard)
    }

    /// `require` semantics: resolve, load and evaluate `module` once; later
    /// calls return the cached result
    pub fn require(&self, module: &str) -> BridgeResult<Dynamic> {
        if let Some(value) = self.inner.loaded.read().get(module) {
            return Ok(value.clone());
        }
        if !self.inner.loading.lock().insert(module.to_string()) {
            return Err(BridgeError::CyclicRequire(module.to_string()));
        }

        let result = self.load_module(module);
        self.inner.loading.lock().remove(module);

        let value = result?;
        self.inner
            .loaded
            .write()
            .insert(module.to_string(), value.clone());
        Ok(value)
    }

    fn load_module(&self, module: &str) -> BridgeResult<Dynamic> {
        let globals = &self.inner.globals;
        let locator = self
            .inner
            .resolvers
            .resolve(module, globals)
            .ok_or_else(|| BridgeError::Resolution(module.to_string()))?;
        let source = self.inner.resolvers.load(&locator, globals)?;
        debug!(
            bundle = self.id(),
            module,
            resolver = locator.resolver_label(),
            "loading module"
        );
        self.eval_named(&source.name, &source.text)
    }

    /// Whether `module` is in the module cache
    pub fn is_loaded(&self, module: &str) -> bool {
        self.inner.loaded.read().contains_key(module)
    }

    /// Empty the module cache so the next `require` re-evaluates
    pub fn clear_loaded(&self) {
        self.inner.loaded.write().clear();
    }

    /// Synthesize or reload a type from host code
    pub fn make_type(&self, base: &TypeRef, name: &str, overrides: OverrideTable) -> BridgeResult<TypeRef> {
        maker::make_type(self, base, name, overrides, None)
    }
}
