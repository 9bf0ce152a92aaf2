//! MoonSpeak Engine
//!
//! The bridge between host types and Rhai scripts:
//! - **Marshalling**: host `Value`s to and from script values, including
//!   `ref`/`out` round-tripping and multi-value results (`marshal` module)
//! - **Type factory**: script `class(...)` definitions become real host types
//!   derived from a base type, with live reload (`maker` module)
//! - **Overrides**: the swappable per-type table of script callables
//!   (`registry` module)
//! - **Instance state**: per-instance script members with typed writes to
//!   host fields (`instance` module)
//! - **Resolution**: `require` through file resolvers and the host type
//!   resolver (`resolver` module)
//! - **Environments**: one engine, function library, module cache and type
//!   scope per script bundle (`env` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use moonspeak_engine::{EnvConfig, ResolverChain, ScriptEnv, TypeResolver};
//! use moonspeak_sdk::{HostObject, TypeDomain, Value};
//!
//! let domain = Arc::new(TypeDomain::new().with_catalog(game_catalog()));
//! let chain = ResolverChain::new().with(Arc::new(TypeResolver::new(domain)));
//! let env = ScriptEnv::new(EnvConfig::new("demo"), chain);
//!
//! let ty = env.eval(r#"
//!     class("Demo.Loud", require("Game.Greeter"), #{
//!         Greet: |me, who| "HELLO " + who.to_upper()
//!     })
//! "#)?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod env;
pub mod error;
pub mod globals;
pub mod handles;
pub mod instance;
pub mod maker;
pub mod marshal;
pub mod registry;
pub mod resolver;

mod api;

pub use api::type_of;
pub use env::{EnvConfig, ScriptEnv, WeakEnv, SCRIPT_LOG_TARGET};
pub use error::{BridgeError, BridgeResult, MarshalError};
pub use globals::{PublishedTypes, ScriptGlobals, GLOBALS_NAME};
pub use handles::{BoundMethod, ObjectHandle, TypeHandle};
pub use instance::InstanceState;
pub use maker::{make_type, ClassBuilder, ExposedMethod, TypeModule, TypeStatics, BASE_PREFIX};
pub use registry::{OverrideRegistry, OverrideTable, CONSTRUCTOR_KEY};
pub use resolver::{FileResolver, Locator, ModuleResolver, ModuleSource, ResolverChain, TypeResolver};

pub use rhai;
