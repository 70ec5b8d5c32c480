//! Backend state core of an ingress controller.
//!
//! Maintains the in-memory model of reverse-proxy backends derived from
//! cluster service and endpoint state, and produces the ordered, sharded
//! diff a renderer needs to regenerate proxy configuration without
//! unnecessary reloads.

pub mod backend;
pub mod cluster;
pub mod config;
pub mod error;
pub mod observability;
pub mod reconcile;
pub mod resolver;

pub use backend::{backends_match, Backend, BackendId, Backends, Endpoint};
pub use config::ControllerConfig;
pub use error::ResolveError;
pub use reconcile::{CycleReport, Reconciler};
