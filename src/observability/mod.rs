//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, one span per cycle)
//!     → metrics.rs (backend counters and shard gauges)
//!
//! Consumers:
//!     → Log aggregation (stderr)
//!     → Any recorder installed for the `metrics` facade
//! ```
//!
//! # Design Decisions
//! - Structured fields rather than formatted messages
//! - Cycle ID flows through every event of a cycle
//! - No exporter is installed here; without a recorder metrics are no-ops

pub mod logging;
pub mod metrics;
