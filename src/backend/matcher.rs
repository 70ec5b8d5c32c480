//! Backend equivalence matching.
//!
//! # Responsibilities
//! - Decide whether two backend snapshots configure the proxy identically
//! - Ignore endpoint ordering, which the cluster API does not keep stable
//!
//! # Design Decisions
//! - Endpoints are compared as multisets, never assumed pre-sorted
//! - Everything else is compared structurally
//! - Absent on both sides is equal; absent on one side is not

use std::collections::HashMap;

use crate::backend::backend::Backend;
use crate::backend::endpoint::Endpoint;

/// Return true if both snapshots are operationally equal.
pub fn backends_match(a: Option<&Backend>, b: Option<&Backend>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            a.id == b.id
                && a.name == b.name
                && a.shard == b.shard
                && a.custom_config == b.custom_config
                && a.paths == b.paths
                && endpoints_match(&a.endpoints, &b.endpoints)
        }
        _ => false,
    }
}

fn endpoints_match(a: &[Endpoint], b: &[Endpoint]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut pending: HashMap<&Endpoint, usize> = HashMap::with_capacity(a.len());
    for ep in a {
        *pending.entry(ep).or_default() += 1;
    }
    for ep in b {
        match pending.get_mut(ep) {
            Some(count) if *count > 0 => *count -= 1,
            _ => return false,
        }
    }
    true
}
