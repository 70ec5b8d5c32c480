//! Named cookie strategies.
//!
//! Strategies are linked into the binary and selected by name from
//! configuration. An empty name selects [`NoopResolver`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ResolveError, Result};
use crate::resolver::cookie::{CookieFn, CookieResolver, FnResolver, NoopResolver};

/// Lookup table from strategy name to cookie function.
#[derive(Debug, Default, Clone)]
pub struct ResolverRegistry {
    strategies: HashMap<String, CookieFn>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in strategies:
    /// - `endpoint-address`: `<address>_<port>`
    /// - `pod-name`: name part of the target reference, address when empty
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("endpoint-address", endpoint_address);
        registry.register("pod-name", pod_name);
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, func: CookieFn) {
        self.strategies.insert(name.into(), func);
    }

    /// Sorted strategy names.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.strategies.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Select a strategy by name. An empty name disables cookie resolution.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn CookieResolver>> {
        if name.is_empty() {
            return Ok(Arc::new(NoopResolver));
        }
        match self.strategies.get(name) {
            Some(func) => {
                tracing::info!(strategy = %name, "Cookie resolver loaded");
                Ok(Arc::new(FnResolver::new(name, *func)))
            }
            None => Err(ResolveError::not_found("cookie strategy", name)),
        }
    }
}

/// Select a built-in strategy by name.
pub fn create_resolver(name: &str) -> Result<Arc<dyn CookieResolver>> {
    ResolverRegistry::with_builtins().resolve(name)
}

fn endpoint_address(address: &str, port: u16, _target_ref: &str) -> String {
    format!("{}_{}", address, port)
}

fn pod_name(address: &str, _port: u16, target_ref: &str) -> String {
    match target_ref.rsplit_once('/') {
        Some((_, name)) if !name.is_empty() => name.to_string(),
        _ if !target_ref.is_empty() => target_ref.to_string(),
        _ => address.to_string(),
    }
}
