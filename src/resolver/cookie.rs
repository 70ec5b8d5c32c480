//! Cookie resolver capability.

use std::fmt;

use crate::error::{ResolveError, Result};

/// Signature of a cookie strategy: `(address, port, target_ref) -> cookie`.
pub type CookieFn = fn(&str, u16, &str) -> String;

/// Optional capability computing the sticky-session cookie of an endpoint.
pub trait CookieResolver: Send + Sync + fmt::Debug {
    /// Whether `resolve_cookie` may be called.
    fn can_resolve_cookie(&self) -> bool;

    /// Compute the cookie value of an endpoint.
    fn resolve_cookie(&self, address: &str, port: u16, target_ref: &str) -> Result<String>;
}

/// Resolver used when no strategy is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopResolver;

impl CookieResolver for NoopResolver {
    fn can_resolve_cookie(&self) -> bool {
        false
    }

    fn resolve_cookie(&self, _address: &str, _port: u16, _target_ref: &str) -> Result<String> {
        Err(ResolveError::CookieUnavailable)
    }
}

/// Resolver backed by a named function.
#[derive(Clone)]
pub struct FnResolver {
    name: String,
    func: CookieFn,
}

impl FnResolver {
    pub fn new(name: impl Into<String>, func: CookieFn) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for FnResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnResolver").field("name", &self.name).finish()
    }
}

impl CookieResolver for FnResolver {
    fn can_resolve_cookie(&self) -> bool {
        true
    }

    fn resolve_cookie(&self, address: &str, port: u16, target_ref: &str) -> Result<String> {
        Ok((self.func)(address, port, target_ref))
    }
}
