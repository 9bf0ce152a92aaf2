//! Ordered resolver chain

use std::sync::Arc;

use crate::error::BridgeError;
use crate::globals::ScriptGlobals;

use super::{ModuleResolver, ModuleSource};

/// Where a module was found: which resolver, and its key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    resolver: usize,
    label: String,
    key: String,
}

impl Locator {
    /// Position of the matching resolver in its chain
    pub fn resolver_index(&self) -> usize {
        self.resolver
    }

    /// Label of the matching resolver
    pub fn resolver_label(&self) -> &str {
        &self.label
    }

    /// Resolver-specific key
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Resolvers consulted in order; the first match wins
#[derive(Clone, Default)]
pub struct ResolverChain {
    resolvers: Vec<Arc<dyn ModuleResolver>>,
}

impl ResolverChain {
    /// Empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resolver
    pub fn with(mut self, resolver: Arc<dyn ModuleResolver>) -> Self {
        self.push(resolver);
        self
    }

    /// Append a resolver
    pub fn push(&mut self, resolver: Arc<dyn ModuleResolver>) {
        self.resolvers.push(resolver);
    }

    /// Number of resolvers
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    /// Whether the chain is empty
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Resolver labels in priority order
    pub fn labels(&self) -> Vec<String> {
        self.resolvers.iter().map(|r| r.label().to_string()).collect()
    }

    /// Find the first resolver that can supply `module`
    pub fn resolve(&self, module: &str, globals: &ScriptGlobals) -> Option<Locator> {
        self.resolvers.iter().enumerate().find_map(|(index, resolver)| {
            resolver.resolve(module, globals).map(|key| Locator {
                resolver: index,
                label: resolver.label().to_string(),
                key,
            })
        })
    }

    /// Load through the resolver that produced `locator`
    pub fn load(&self, locator: &Locator, globals: &ScriptGlobals) -> Result<ModuleSource, BridgeError> {
        let resolver = self
            .resolvers
            .get(locator.resolver)
            .ok_or_else(|| BridgeError::Resolution(locator.key.clone()))?;
        resolver.load(&locator.key, globals)
    }
}
