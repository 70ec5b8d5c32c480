//! Error types of the backend collaborators.
//!
//! The store itself has no fallible operations; these errors come from
//! resolving endpoints and cookies before data reaches it.

use std::io;
use thiserror::Error;

/// Failure resolving cluster objects into backend data.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A cluster object is missing; callers treat it as "no endpoints".
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    /// A port outside 1..=65535.
    #[error("invalid port number: {0}")]
    InvalidPort(i64),

    /// Name resolution of an external-name service failed.
    #[error("failed to resolve '{host}': {source}")]
    Lookup {
        host: String,
        #[source]
        source: io::Error,
    },

    /// The cookie resolver was called without checking `can_resolve_cookie`.
    #[error("cookie resolver function is not registered")]
    CookieUnavailable,
}

impl ResolveError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        ResolveError::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::NotFound { .. })
    }
}

pub type Result<T, E = ResolveError> = std::result::Result<T, E>;
