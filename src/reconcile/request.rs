//! Cycle input: desired backends and the cluster objects they refer to.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::backend::{BackendId, BackendPath, Hsts, PathLink};
use crate::cluster::ClusterObjects;

/// One path rule requested for a backend, with its overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathRequest {
    pub hostname: String,
    pub path: String,
    pub ssl_redirect: bool,
    pub hsts: Hsts,
    pub whitelist_http: Option<Vec<String>>,
    pub max_body_size: Option<u64>,
}

impl PathRequest {
    pub fn link(&self) -> PathLink {
        PathLink::new(self.hostname.clone(), self.path.clone())
    }

    pub(crate) fn apply(&self, path: &mut BackendPath) {
        path.ssl_redirect = self.ssl_redirect;
        path.hsts = self.hsts.clone();
        path.whitelist_http = self.whitelist_http.clone();
        path.max_body_size = self.max_body_size;
    }
}

/// A backend the ingress rules ask for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendRequest {
    pub namespace: String,
    /// Service name.
    pub service: String,
    /// Service port, by number, name or target port.
    pub port: String,
    pub paths: Vec<PathRequest>,
    pub custom_config: Vec<String>,
    /// Route to the service's cluster IP instead of its endpoints.
    pub service_upstream: bool,
}

impl BackendRequest {
    pub fn backend_id(&self) -> BackendId {
        BackendId::new(self.namespace.clone(), self.service.clone(), self.port.clone())
    }

    /// `namespace/service`
    pub fn service_name(&self) -> String {
        format!("{}/{}", self.namespace, self.service)
    }
}

/// Everything one cycle needs, as read from a snapshot file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    #[serde(flatten)]
    pub objects: ClusterObjects,
    pub backends: Vec<BackendRequest>,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Read a JSON snapshot file.
pub fn load_snapshot(path: &Path) -> Result<Snapshot, SnapshotError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
