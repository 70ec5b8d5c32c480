//! Reconciliation subsystem.
//!
//! # Data Flow
//! ```text
//! Snapshot (cluster objects + requested backends)
//!     → request.rs (BackendRequest, PathRequest)
//!     → cycle.rs (remove, rebuild, resolve endpoints, shrink)
//!     → CycleReport (added / removed / modified / changed shards)
//!     → plan.rs (changed shards with grouped path config)
//!     → renderer (external), then Backends::commit
//! ```
//!
//! # Design Decisions
//! - One cycle at a time per store; callers serialize cycles
//! - Collaborator failures degrade a single backend, never the cycle

pub mod cycle;
pub mod plan;
pub mod request;

pub use cycle::{CycleReport, Reconciler};
pub use plan::{render_plan, BackendPlan, ShardPlan};
pub use request::{load_snapshot, BackendRequest, PathRequest, Snapshot, SnapshotError};
