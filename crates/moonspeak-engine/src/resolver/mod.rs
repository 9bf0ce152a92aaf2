//! Module resolution
//!
//! `require(name)` asks a chain of resolvers, in order, whether they can
//! supply `name`. The first resolver that says yes loads it. File
//! resolvers come first; the type resolver, which maps names onto live
//! host types, comes last.

mod chain;
mod file;
mod types;

pub use chain::{Locator, ResolverChain};
pub use file::FileResolver;
pub use types::TypeResolver;

use std::path::PathBuf;

use crate::error::BridgeError;
use crate::globals::ScriptGlobals;

/// Source text produced by a resolver
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleSource {
    /// Name used in script error positions
    pub name: String,
    /// Script source
    pub text: String,
    /// File the source was read from, if any
    pub path: Option<PathBuf>,
}

/// One strategy for answering "what does this module name refer to"
pub trait ModuleResolver: Send + Sync {
    /// Short label for diagnostics
    fn label(&self) -> &str;

    /// Resolver-specific key for `module`, or `None` if this resolver
    /// cannot supply it
    fn resolve(&self, module: &str, globals: &ScriptGlobals) -> Option<String>;

    /// Produce the source for a key returned by `resolve`
    fn load(&self, key: &str, globals: &ScriptGlobals) -> Result<ModuleSource, BridgeError>;
}
