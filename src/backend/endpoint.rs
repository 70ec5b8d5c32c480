//! Backend endpoint value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One routable destination of a backend.
///
/// Equality covers every field, so two endpoints observed in different
/// cycles compare equal only when the proxy would treat them the same.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// IP address or hostname.
    pub address: String,
    /// Destination port.
    pub port: u16,
    /// Owning object as `namespace/name`; empty when not backed by a pod.
    pub target_ref: String,
    /// Sticky session cookie value, empty when not resolved.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cookie_value: String,
}

impl Endpoint {
    /// Create an endpoint owned by a cluster object.
    pub fn new(address: impl Into<String>, port: u16, target_ref: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            port,
            target_ref: target_ref.into(),
            cookie_value: String::new(),
        }
    }

    /// Create an endpoint that was not resolved from a pod, e.g. an external name.
    pub fn from_ip(address: impl Into<String>, port: u16) -> Self {
        Self::new(address, port, "")
    }

    /// Return a copy carrying the given cookie value.
    pub fn with_cookie(mut self, cookie_value: impl Into<String>) -> Self {
        self.cookie_value = cookie_value.into();
        self
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)?;
        if !self.target_ref.is_empty() {
            write!(f, " ({})", self.target_ref)?;
        }
        Ok(())
    }
}
