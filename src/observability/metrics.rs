//! Metrics collection.
//!
//! # Metrics
//! - `ingress_backends_total` (gauge): committed backends
//! - `ingress_backends_added_total` (counter): backends added by cycles
//! - `ingress_backends_removed_total` (counter): backends removed by cycles
//! - `ingress_backends_modified_total` (counter): backends changed in place
//! - `ingress_shard_backends` (gauge): backends per shard, label `shard`
//! - `ingress_cycles_total` (counter): completed cycles

use metrics::{counter, gauge};

use crate::backend::Backends;
use crate::reconcile::CycleReport;

/// Record the outcome of one reconciliation cycle.
pub fn record_cycle(backends: &Backends, report: &CycleReport) {
    counter!("ingress_cycles_total").increment(1);
    counter!("ingress_backends_added_total").increment(report.added.len() as u64);
    counter!("ingress_backends_removed_total").increment(report.removed.len() as u64);
    counter!("ingress_backends_modified_total").increment(report.modified.len() as u64);
    gauge!("ingress_backends_total").set(backends.len() as f64);
    for shard in 0..backends.shard_sets() {
        gauge!("ingress_shard_backends", "shard" => shard.to_string()).set(backends.shard_names(shard).len() as f64);
    }
}
