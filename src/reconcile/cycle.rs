//! Reconciliation cycle.
//!
//! # Responsibilities
//! - Bring the store in line with the requested backends
//! - Resolve endpoints and cookies through the collaborators
//! - Leave the store shrunk, with its diff ready for the renderer
//!
//! # Design Decisions
//! - Requested backends are removed and rebuilt; `shrink` then cancels
//!   those that came back identical
//! - A rebuilt backend inherits the path IDs of its removed snapshot, so
//!   listing order of the request does not matter
//! - A missing service or Endpoints object leaves the backend empty
//! - A failed host lookup keeps the previous endpoints
//! - An invalid port rejects the update: the previous backend is restored,
//!   a new one is not created
//! - The caller commits after rendering

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::backend::{BackendId, Backends, Endpoint};
use crate::cluster::{
    create_endpoints, create_svc_endpoint, find_env_from_pod, find_service_port, Cache, HostLookup, SystemLookup,
};
use crate::config::ControllerConfig;
use crate::error::{ResolveError, Result};
use crate::observability::metrics;
use crate::reconcile::request::BackendRequest;
use crate::resolver::{CookieResolver, NoopResolver, ResolverRegistry};

/// Outcome of one cycle, names sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub id: Uuid,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
    pub changed_shards: Vec<usize>,
}

impl CycleReport {
    /// Summarize the pending diff of a store.
    pub fn from_store(id: Uuid, backends: &Backends) -> Self {
        Self {
            id,
            added: owned(backends.items_add()),
            removed: owned(backends.items_del()),
            modified: owned(backends.items_modified()),
            changed_shards: backends.changed_shards(),
        }
    }

    /// True when the proxy configuration needs to be regenerated.
    pub fn reload_required(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty() || !self.modified.is_empty()
    }
}

fn owned(names: Vec<&str>) -> Vec<String> {
    names.into_iter().map(String::from).collect()
}

/// Drives cycles against a store, owning the collaborators.
pub struct Reconciler {
    resolver: Arc<dyn CookieResolver>,
    lookup: Box<dyn HostLookup + Send + Sync>,
    /// Pod environment variable overriding the cookie value.
    cookie_env: Option<String>,
    metrics_enabled: bool,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("resolver", &self.resolver)
            .field("cookie_env", &self.cookie_env)
            .field("metrics_enabled", &self.metrics_enabled)
            .finish_non_exhaustive()
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(Arc::new(NoopResolver), SystemLookup)
    }
}

impl Reconciler {
    pub fn new(resolver: Arc<dyn CookieResolver>, lookup: impl HostLookup + Send + Sync + 'static) -> Self {
        Self {
            resolver,
            lookup: Box::new(lookup),
            cookie_env: None,
            metrics_enabled: false,
        }
    }

    /// Build from configuration with the built-in cookie strategies, using
    /// the system host resolver.
    pub fn from_config(config: &ControllerConfig) -> Result<Self> {
        Self::from_config_with(config, &ResolverRegistry::with_builtins())
    }

    /// Build from configuration, selecting the cookie strategy from `registry`.
    pub fn from_config_with(config: &ControllerConfig, registry: &ResolverRegistry) -> Result<Self> {
        let resolver = registry.resolve(&config.resolver.cookie_strategy)?;
        Ok(Self::new(resolver, SystemLookup)
            .with_cookie_env(&config.resolver.cookie_env)
            .with_metrics(config.observability.metrics_enabled))
    }

    /// Take cookie values from this environment variable of the endpoint's
    /// pod when set there. Empty disables it.
    pub fn with_cookie_env(mut self, name: &str) -> Self {
        self.cookie_env = (!name.is_empty()).then(|| name.to_string());
        self
    }

    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }

    /// Run one cycle: after it, `backends` holds exactly the requested
    /// backends and its shrunk diff describes the transition.
    pub fn run_cycle(&self, backends: &mut Backends, cache: &dyn Cache, requests: &[BackendRequest]) -> CycleReport {
        let id = Uuid::new_v4();
        let span = tracing::info_span!("cycle", id = %id);
        let _enter = span.enter();

        let requested: HashSet<String> = requests.iter().map(|r| r.backend_id().to_string()).collect();
        let mut rebuild: Vec<BackendId> = backends.items().map(|b| b.backend_id()).collect();
        rebuild.sort_by_key(|id| id.to_string());
        let stale = rebuild.iter().filter(|id| !requested.contains(&id.to_string())).count();
        tracing::debug!(requested = requested.len(), stale, "Starting cycle");
        backends.remove_all(&rebuild);

        for request in requests {
            self.sync_backend(backends, cache, request);
        }
        backends.shrink();

        let report = CycleReport::from_store(id, backends);
        tracing::info!(
            backends = backends.len(),
            added = report.added.len(),
            removed = report.removed.len(),
            modified = report.modified.len(),
            changed_shards = ?report.changed_shards,
            "Cycle finished"
        );
        if self.metrics_enabled {
            metrics::record_cycle(backends, &report);
        }
        report
    }

    fn sync_backend(&self, backends: &mut Backends, cache: &dyn Cache, request: &BackendRequest) {
        let name = request.backend_id().to_string();
        let previous = backends.removed(&name).cloned();
        let endpoints = match self.resolve_endpoints(cache, request) {
            Ok(endpoints) => endpoints,
            Err(e @ ResolveError::InvalidPort(_)) => {
                tracing::warn!(backend = %name, error = %e, "Rejecting backend update");
                if let Some(previous) = previous {
                    let shard = backends.shard_of(&name);
                    let backend = backends.acquire_backend(&request.namespace, &request.service, &request.port);
                    *backend = previous;
                    backend.shard = shard;
                }
                return;
            }
            Err(e @ ResolveError::Lookup { .. }) => {
                tracing::warn!(backend = %name, error = %e, "Keeping previous endpoints");
                previous.as_ref().map(|b| b.endpoints.clone()).unwrap_or_default()
            }
            Err(e) => {
                tracing::warn!(backend = %name, error = %e, "No endpoints for backend");
                Vec::new()
            }
        };

        let links: Vec<_> = request.paths.iter().map(|p| p.link()).collect();
        let backend = backends.acquire_backend(&request.namespace, &request.service, &request.port);
        if let Some(previous) = &previous {
            backend.inherit_paths(previous, &links);
        }
        for (path, link) in request.paths.iter().zip(links) {
            path.apply(backend.add_backend_path(link));
        }
        for line in &request.custom_config {
            if !backend.custom_config.contains(line) {
                backend.custom_config.push(line.clone());
            }
        }
        for endpoint in endpoints {
            backend.acquire_endpoint(endpoint);
        }
    }

    fn resolve_endpoints(&self, cache: &dyn Cache, request: &BackendRequest) -> Result<Vec<Endpoint>> {
        let svc = cache.get_service(&request.service_name())?;
        let svc_port = find_service_port(&svc, &request.port).ok_or_else(|| {
            ResolveError::not_found("service port", format!("{}:{}", request.service_name(), request.port))
        })?;
        if request.service_upstream {
            return Ok(vec![create_svc_endpoint(&svc, svc_port)?]);
        }
        let resolved = create_endpoints(cache, self.lookup.as_ref(), &svc, svc_port)?;
        Ok(resolved
            .ready
            .into_iter()
            .map(|ep| self.resolve_cookie(cache, ep))
            .collect())
    }

    fn resolve_cookie(&self, cache: &dyn Cache, ep: Endpoint) -> Endpoint {
        if let Some(env) = &self.cookie_env {
            if let Some(cookie) = find_env_from_pod(cache, &ep.target_ref, env) {
                return ep.with_cookie(cookie);
            }
        }
        if !self.resolver.can_resolve_cookie() {
            return ep;
        }
        match self.resolver.resolve_cookie(&ep.address, ep.port, &ep.target_ref) {
            Ok(cookie) => ep.with_cookie(cookie),
            Err(e) => {
                tracing::warn!(endpoint = %ep, error = %e, "Cookie resolution failed");
                ep
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::SnapshotCache;

    #[test]
    fn test_report_from_store() {
        let mut backends = Backends::new(0);
        backends.acquire_backend("default", "app2", "8080");
        backends.acquire_backend("default", "app1", "8080");
        let id = Uuid::new_v4();
        let report = CycleReport::from_store(id, &backends);
        assert_eq!(report.id, id);
        assert_eq!(report.added, vec!["default_app1_8080", "default_app2_8080"]);
        assert_eq!(report.changed_shards, vec![0]);
        assert!(report.reload_required());

        backends.commit();
        assert!(!CycleReport::from_store(id, &backends).reload_required());
    }

    #[test]
    fn test_from_config() {
        let mut config = ControllerConfig::default();
        config.resolver.cookie_strategy = "pod-name".to_string();
        let reconciler = Reconciler::from_config(&config).unwrap();
        assert!(reconciler.resolver.can_resolve_cookie());
        assert_eq!(reconciler.metrics_enabled, config.observability.metrics_enabled);

        config.resolver.cookie_strategy = "missing".to_string();
        assert!(Reconciler::from_config(&config).unwrap_err().is_not_found());
    }

    #[test]
    fn test_from_config_with_custom_registry() {
        let mut config = ControllerConfig::default();
        config.resolver.cookie_strategy = "custom".to_string();
        config.resolver.cookie_env = "COOKIE".to_string();
        assert!(Reconciler::from_config(&config).is_err());

        let mut registry = ResolverRegistry::new();
        registry.register("custom", |ip, _, _| format!("{}_custom", ip));
        let reconciler = Reconciler::from_config_with(&config, &registry).unwrap();
        assert_eq!(reconciler.resolver.resolve_cookie("10.0.0.1", 80, "").unwrap(), "10.0.0.1_custom");
        assert_eq!(reconciler.cookie_env.as_deref(), Some("COOKIE"));
    }

    #[test]
    fn test_empty_cycle_clears_store() {
        let mut backends = Backends::new(2);
        backends.acquire_backend("default", "app", "8080");
        backends.commit();

        let report = Reconciler::default().run_cycle(&mut backends, &SnapshotCache::default(), &[]);
        assert!(backends.is_empty());
        assert_eq!(report.removed, vec!["default_app_8080"]);
        assert!(report.added.is_empty());
    }
}
