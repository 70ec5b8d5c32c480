//! Backend state subsystem.
//!
//! # Data Flow
//! ```text
//! Reconciliation cycle observes cluster state
//!     → store.rs (acquire_backend / remove_all)
//!         - items, items_add, items_del tracking
//!         - shard assignment by key hash
//!     → backend.rs (add paths, endpoints, custom config)
//!         - path.rs keeps paths most-specific-first
//!     → store.rs (shrink)
//!         - matcher.rs decides if a cancelled pair still changed
//!     → path_config.rs (group paths by shared config)
//!     → renderer (external) regenerates changed shards
//! ```
//!
//! # Design Decisions
//! - Single writer: one cycle owns the store end-to-end, no locking
//! - Output order never depends on hash map iteration order
//! - Path IDs are stable across reorders and removals
//! - Endpoint order is preserved but ignored for equivalence

pub mod backend;
pub mod endpoint;
pub mod matcher;
pub mod path;
pub mod path_config;
pub mod store;

pub use backend::{build_id, Backend, BackendId};
pub use endpoint::Endpoint;
pub use matcher::backends_match;
pub use path::{BackendPath, Hsts, PathLink};
pub use path_config::{BackendPathConfig, PathConfig, PathConfigItem};
pub use store::Backends;
