//! Service and endpoint resolution.
//!
//! # Responsibilities
//! - Find the service port a backend refers to
//! - Turn an Endpoints object, or an external name, into backend endpoints
//! - Read pod details used by cookie strategies
//!
//! # Design Decisions
//! - Only TCP endpoint ports are considered
//! - An unnamed service port matches every endpoint port name
//! - Invalid ports reject the whole resolution, nothing partial is returned

use crate::backend::Endpoint;
use crate::cluster::cache::Cache;
use crate::cluster::lookup::HostLookup;
use crate::cluster::model::{
    EndpointAddress, EndpointPort, ObjectReference, Pod, Protocol, Service, ServicePort, ServiceType,
};
use crate::error::{ResolveError, Result};

/// Destinations of a service port split by readiness.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedEndpoints {
    pub ready: Vec<Endpoint>,
    pub not_ready: Vec<Endpoint>,
}

/// Find a service port by name, by target port, then by port number.
pub fn find_service_port<'a>(svc: &'a Service, service_port: &str) -> Option<&'a ServicePort> {
    let ports = &svc.spec.ports;
    if let Some(port) = ports
        .iter()
        .find(|p| p.name == service_port || p.target_port.to_string() == service_port)
    {
        return Some(port);
    }
    let number: i32 = service_port.parse().ok()?;
    ports.iter().find(|p| p.port == number)
}

/// Container port number a service port forwards to on a pod.
///
/// A numeric target port is returned as is. A named target port is looked
/// up in the pod's containers with the same protocol. Returns 0 when not found.
pub fn find_container_port(pod: &Pod, svc_port: &ServicePort) -> i32 {
    let target = svc_port.target_port.int_value();
    if target > 0 {
        return target;
    }
    let port_name = svc_port.target_port.to_string();
    pod.spec
        .containers
        .iter()
        .flat_map(|c| c.ports.iter())
        .find(|p| p.protocol == svc_port.protocol && p.name == port_name)
        .map(|p| p.container_port)
        .unwrap_or(0)
}

/// First non-empty value of an environment variable across a pod's containers.
pub fn find_env_from_pod(cache: &dyn Cache, target_ref: &str, name: &str) -> Option<String> {
    let pod = match cache.get_pod(target_ref) {
        Ok(pod) => pod,
        Err(e) => {
            tracing::debug!(pod = %target_ref, error = %e, "Pod lookup failed");
            return None;
        }
    };
    for container in &pod.spec.containers {
        for env in container.env.iter().filter(|env| env.name == name) {
            if !env.value.is_empty() {
                return Some(env.value.clone());
            }
            if env.value_from.is_some() {
                tracing::warn!(
                    pod = %target_ref,
                    container = %container.name,
                    env = %env.name,
                    "Environment variable is sourced from a reference and cannot be read, use a direct value instead"
                );
            }
        }
    }
    None
}

/// Resolve the ready and not-ready destinations of a service port.
pub fn create_endpoints(
    cache: &dyn Cache,
    lookup: &dyn HostLookup,
    svc: &Service,
    svc_port: &ServicePort,
) -> Result<ResolvedEndpoints> {
    if svc.spec.service_type == ServiceType::ExternalName {
        let ready = create_endpoints_external_name(lookup, svc, svc_port)?;
        return Ok(ResolvedEndpoints {
            ready,
            not_ready: Vec::new(),
        });
    }
    let endpoints = cache.get_endpoints(svc)?;
    let mut resolved = ResolvedEndpoints::default();
    for subset in &endpoints.subsets {
        for ep_port in subset.ports.iter().filter(|p| match_port(svc_port, p)) {
            let port = valid_port(ep_port.port)?;
            resolved
                .ready
                .extend(subset.addresses.iter().map(|addr| new_endpoint_addr(addr, port)));
            resolved
                .not_ready
                .extend(subset.not_ready_addresses.iter().map(|addr| new_endpoint_addr(addr, port)));
        }
    }
    Ok(resolved)
}

/// Endpoint of the service's cluster IP.
pub fn create_svc_endpoint(svc: &Service, svc_port: &ServicePort) -> Result<Endpoint> {
    let port = valid_port(svc_port.port)?;
    Ok(Endpoint::from_ip(svc.spec.cluster_ip.clone(), port))
}

fn create_endpoints_external_name(
    lookup: &dyn HostLookup,
    svc: &Service,
    svc_port: &ServicePort,
) -> Result<Vec<Endpoint>> {
    let port = valid_port(svc_port.port)?;
    let host = &svc.spec.external_name;
    let ips = lookup.lookup(host).map_err(|source| ResolveError::Lookup {
        host: host.clone(),
        source,
    })?;
    Ok(ips
        .into_iter()
        .map(|ip| Endpoint::from_ip(ip.to_string(), port))
        .collect())
}

fn match_port(svc_port: &ServicePort, ep_port: &EndpointPort) -> bool {
    ep_port.protocol == Protocol::Tcp && (svc_port.name.is_empty() || svc_port.name == ep_port.name)
}

fn valid_port(port: i32) -> Result<u16> {
    match u16::try_from(port) {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ResolveError::InvalidPort(port.into())),
    }
}

fn new_endpoint_addr(addr: &EndpointAddress, port: u16) -> Endpoint {
    Endpoint::new(addr.ip.clone(), port, target_ref_to_string(addr.target_ref.as_ref()))
}

fn target_ref_to_string(target_ref: Option<&ObjectReference>) -> String {
    target_ref
        .map(|r| format!("{}/{}", r.namespace, r.name))
        .unwrap_or_default()
}
