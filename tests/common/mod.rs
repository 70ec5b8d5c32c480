//! Shared cluster fixtures for integration tests.

#![allow(dead_code)]

use ingress_backends::cluster::model::{
    Container, EndpointAddress, EndpointPort, EndpointSubset, Endpoints, EnvVar, IntOrString, ObjectMeta,
    ObjectReference, Pod, PodSpec, Protocol, Service, ServicePort, ServiceType,
};
use ingress_backends::cluster::SnapshotCache;
use ingress_backends::reconcile::{BackendRequest, PathRequest};

/// Service `namespace/name` with one unnamed TCP port, and its Endpoints
/// object listing the comma separated `ips` as ready addresses.
pub fn service(full_name: &str, port: i32, ips: &str) -> (Service, Endpoints) {
    let (namespace, name) = full_name.split_once('/').unwrap_or(("default", full_name));
    let mut svc = Service {
        metadata: ObjectMeta::new(namespace, name),
        ..Default::default()
    };
    svc.spec.cluster_ip = "10.96.0.10".to_string();
    svc.spec.ports = vec![ServicePort {
        name: String::new(),
        protocol: Protocol::Tcp,
        port,
        target_port: IntOrString::Int(port),
    }];

    let addresses = ips
        .split(',')
        .filter(|ip| !ip.is_empty())
        .enumerate()
        .map(|(i, ip)| EndpointAddress {
            ip: ip.to_string(),
            target_ref: Some(ObjectReference {
                kind: "Pod".to_string(),
                namespace: namespace.to_string(),
                name: format!("{}-{}", name, i),
            }),
        })
        .collect();
    let endpoints = Endpoints {
        metadata: ObjectMeta::new(namespace, name),
        subsets: vec![EndpointSubset {
            addresses,
            not_ready_addresses: vec![],
            ports: vec![EndpointPort {
                name: String::new(),
                port,
                protocol: Protocol::Tcp,
            }],
        }],
    };
    (svc, endpoints)
}

/// External-name service `namespace/name` pointing at `host`.
pub fn external_service(full_name: &str, port: i32, host: &str) -> Service {
    let (mut svc, _) = service(full_name, port, "");
    svc.spec.service_type = ServiceType::ExternalName;
    svc.spec.external_name = host.to_string();
    svc
}

/// Pod `namespace/name` with one container carrying the given env vars.
pub fn pod(full_name: &str, env: &[(&str, &str)]) -> Pod {
    let (namespace, name) = full_name.split_once('/').unwrap_or(("default", full_name));
    Pod {
        metadata: ObjectMeta::new(namespace, name),
        spec: PodSpec {
            containers: vec![Container {
                name: "app".to_string(),
                ports: vec![],
                env: env
                    .iter()
                    .map(|(name, value)| EnvVar {
                        name: name.to_string(),
                        value: value.to_string(),
                        value_from: None,
                    })
                    .collect(),
            }],
        },
    }
}

/// Cache holding the given services with their Endpoints objects.
pub fn cache(services: &[(&str, i32, &str)]) -> SnapshotCache {
    let mut cache = SnapshotCache::default();
    for (full_name, port, ips) in services {
        let (svc, endpoints) = service(full_name, *port, ips);
        cache.add_service(svc);
        cache.add_endpoints(endpoints);
    }
    cache
}

/// Request of the backend of `namespace/name:port` serving `hostname` on `paths`.
pub fn request(full_name: &str, port: &str, hostname: &str, paths: &[&str]) -> BackendRequest {
    let (namespace, name) = full_name.split_once('/').unwrap_or(("default", full_name));
    BackendRequest {
        namespace: namespace.to_string(),
        service: name.to_string(),
        port: port.to_string(),
        paths: paths
            .iter()
            .map(|path| PathRequest {
                hostname: hostname.to_string(),
                path: path.to_string(),
                ..Default::default()
            })
            .collect(),
        custom_config: vec![],
        service_upstream: false,
    }
}
