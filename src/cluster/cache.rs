//! Cluster object lookups.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::cluster::model::{Endpoints, Pod, Service};
use crate::error::{ResolveError, Result};

/// Read access to the cluster object cache.
///
/// Names are `namespace/name`. Missing objects are reported as
/// [`ResolveError::NotFound`].
pub trait Cache {
    fn get_service(&self, full_name: &str) -> Result<Service>;
    fn get_endpoints(&self, svc: &Service) -> Result<Endpoints>;
    fn get_pod(&self, full_name: &str) -> Result<Pod>;
}

/// Cluster objects as listed by the API at one point in time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterObjects {
    pub services: Vec<Service>,
    pub endpoints: Vec<Endpoints>,
    pub pods: Vec<Pod>,
}

/// In-memory [`Cache`] over a set of listed objects.
#[derive(Debug, Clone, Default)]
pub struct SnapshotCache {
    services: HashMap<String, Service>,
    endpoints: HashMap<String, Endpoints>,
    pods: HashMap<String, Pod>,
}

impl SnapshotCache {
    pub fn new(objects: ClusterObjects) -> Self {
        let mut cache = Self::default();
        for svc in objects.services {
            cache.add_service(svc);
        }
        for ep in objects.endpoints {
            cache.add_endpoints(ep);
        }
        for pod in objects.pods {
            cache.add_pod(pod);
        }
        cache
    }

    pub fn add_service(&mut self, svc: Service) {
        self.services.insert(svc.metadata.full_name(), svc);
    }

    pub fn add_endpoints(&mut self, ep: Endpoints) {
        self.endpoints.insert(ep.metadata.full_name(), ep);
    }

    pub fn add_pod(&mut self, pod: Pod) {
        self.pods.insert(pod.metadata.full_name(), pod);
    }
}

impl From<ClusterObjects> for SnapshotCache {
    fn from(objects: ClusterObjects) -> Self {
        Self::new(objects)
    }
}

impl Cache for SnapshotCache {
    fn get_service(&self, full_name: &str) -> Result<Service> {
        self.services
            .get(full_name)
            .cloned()
            .ok_or_else(|| ResolveError::not_found("service", full_name))
    }

    fn get_endpoints(&self, svc: &Service) -> Result<Endpoints> {
        let full_name = svc.metadata.full_name();
        self.endpoints
            .get(&full_name)
            .cloned()
            .ok_or_else(|| ResolveError::not_found("endpoints", full_name))
    }

    fn get_pod(&self, full_name: &str) -> Result<Pod> {
        self.pods
            .get(full_name)
            .cloned()
            .ok_or_else(|| ResolveError::not_found("pod", full_name))
    }
}
