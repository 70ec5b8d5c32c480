//! Cluster collaborator interface.
//!
//! # Data Flow
//! ```text
//! Cluster API (external)
//!     → cache.rs (Cache trait: services, endpoints, pods)
//!     → services.rs (service port → ready / not-ready endpoints)
//!         - lookup.rs for external-name services
//!     → backend store
//! ```
//!
//! # Design Decisions
//! - The store never talks to the cluster; resolution happens before it
//! - Not-found is recovered by callers as "no endpoints"
//! - Host resolution is behind a trait so cycles can run offline

pub mod cache;
pub mod lookup;
pub mod model;
pub mod services;

pub use cache::{Cache, ClusterObjects, SnapshotCache};
pub use lookup::{HostLookup, StaticLookup, SystemLookup};
pub use services::{
    create_endpoints, create_svc_endpoint, find_container_port, find_env_from_pod, find_service_port,
    ResolvedEndpoints,
};
