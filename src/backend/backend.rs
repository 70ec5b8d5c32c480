//! Backend aggregate.
//!
//! # Responsibilities
//! - Hold the identity, path rules, endpoints and custom directives of one
//!   service port
//! - Allocate path IDs and keep paths ordered for first-match evaluation
//! - Deduplicate endpoints by address and port

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::backend::endpoint::Endpoint;
use crate::backend::path::{path_id, sort_paths, BackendPath, PathLink};

/// Build the canonical store key `namespace_name_port`.
pub fn build_id(namespace: &str, name: &str, port: &str) -> String {
    let mut id = String::with_capacity(namespace.len() + name.len() + port.len() + 2);
    id.push_str(namespace);
    id.push('_');
    id.push_str(name);
    id.push('_');
    id.push_str(port);
    id
}

/// Logical key of a backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackendId {
    pub namespace: String,
    pub name: String,
    /// Service port, by number or by name.
    pub port: String,
}

impl BackendId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&build_id(&self.namespace, &self.name, &self.port))
    }
}

/// Reverse-proxy backend of one service port.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Backend {
    pub id: BackendId,
    /// Canonical key, see [`build_id`].
    pub name: String,
    /// Shard index assigned by the store.
    pub shard: usize,
    /// Path rules, most specific first.
    pub paths: Vec<BackendPath>,
    /// Destinations in insertion order.
    pub endpoints: Vec<Endpoint>,
    /// Free-form directives copied verbatim into the proxy config.
    pub custom_config: Vec<String>,
    #[serde(skip)]
    path_seq: u32,
}

impl Backend {
    /// Create an empty backend. The store assigns the shard.
    pub fn new(namespace: &str, name: &str, port: &str) -> Self {
        Self {
            id: BackendId::new(namespace, name, port),
            name: build_id(namespace, name, port),
            ..Default::default()
        }
    }

    pub fn backend_id(&self) -> BackendId {
        self.id.clone()
    }

    /// Register a path rule, returning the new or already existing entry.
    ///
    /// A link already present is left untouched. A new link gets the next
    /// sequential ID; IDs of removed paths are never handed out again.
    pub fn add_backend_path(&mut self, link: PathLink) -> &mut BackendPath {
        let pos = match self.paths.iter().position(|p| p.link == link) {
            Some(pos) => pos,
            None => {
                self.path_seq += 1;
                let id = path_id(self.path_seq);
                tracing::trace!(backend = %self.name, path = %link, id = %id, "Adding backend path");
                self.paths.push(BackendPath::new(id.clone(), link));
                sort_paths(&mut self.paths);
                self.paths
                    .iter()
                    .position(|p| p.id == id)
                    .unwrap_or(self.paths.len() - 1)
            }
        };
        &mut self.paths[pos]
    }

    /// Carry path identity over from an earlier snapshot of this backend.
    ///
    /// Paths of `previous` whose link is in `links` are registered again
    /// with their ID and in their previous order, overrides reset. Later
    /// additions continue the previous ID sequence.
    pub fn inherit_paths<'a>(&mut self, previous: &Backend, links: impl IntoIterator<Item = &'a PathLink>) {
        let wanted: HashSet<&PathLink> = links.into_iter().collect();
        self.path_seq = self.path_seq.max(previous.path_seq);
        for path in previous.paths.iter().filter(|p| wanted.contains(&p.link)) {
            if self.find_path(&path.link).is_none() {
                self.paths.push(BackendPath::new(path.id.clone(), path.link.clone()));
            }
        }
        sort_paths(&mut self.paths);
    }

    pub fn find_path(&self, link: &PathLink) -> Option<&BackendPath> {
        self.paths.iter().find(|p| &p.link == link)
    }

    /// Remove a path rule. Remaining paths keep their IDs and order.
    pub fn remove_backend_path(&mut self, link: &PathLink) -> Option<BackendPath> {
        let pos = self.paths.iter().position(|p| &p.link == link)?;
        Some(self.paths.remove(pos))
    }

    /// Add an endpoint unless one with the same address and port exists.
    pub fn acquire_endpoint(&mut self, endpoint: Endpoint) -> &Endpoint {
        let pos = match self
            .endpoints
            .iter()
            .position(|e| e.address == endpoint.address && e.port == endpoint.port)
        {
            Some(pos) => pos,
            None => {
                self.endpoints.push(endpoint);
                self.endpoints.len() - 1
            }
        };
        &self.endpoints[pos]
    }

    pub fn find_endpoint(&self, address: &str, port: u16) -> Option<&Endpoint> {
        self.endpoints
            .iter()
            .find(|e| e.address == address && e.port == port)
    }
}
