//! Backends store.
//!
//! # Responsibilities
//! - Own every backend aggregate, keyed by canonical name
//! - Partition backends into shards by key hash
//! - Track additions and removals since the last commit
//! - Cancel add/remove pairs that need no external action
//!
//! # Design Decisions
//! - Shard of a key is `fnv1a(key) % shard_count`, stable for a fixed count
//! - Zero shards means one implicit shard
//! - Removed backends are kept as snapshots: the latest one for callers,
//!   the first one since the last commit for comparison on re-add
//! - All output listings are sorted by name

use fnv::FnvHasher;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::hash::Hasher;

use crate::backend::backend::{build_id, Backend, BackendId};
use crate::backend::matcher::backends_match;

/// The authoritative set of backends of one controller.
///
/// Single writer: one reconciliation cycle at a time owns the store.
#[derive(Debug, Default)]
pub struct Backends {
    items: HashMap<String, Backend>,
    items_add: HashSet<String>,
    items_del: HashMap<String, Backend>,
    /// First snapshot of each name removed since the last commit.
    items_base: HashMap<String, Backend>,
    items_mod: BTreeSet<String>,
    shards_mod: BTreeSet<usize>,
    shard_count: usize,
    shards: Vec<HashSet<String>>,
}

impl Backends {
    /// Create an empty store with `shard_count` shards; 0 disables sharding.
    pub fn new(shard_count: usize) -> Self {
        Self {
            shard_count,
            shards: vec![HashSet::new(); shard_count.max(1)],
            ..Default::default()
        }
    }

    /// Number of configured shards, 0 when sharding is disabled.
    pub fn shard_count(&self) -> usize {
        self.shard_count
    }

    /// Shard index of a canonical key under the current shard count.
    pub fn shard_of(&self, key: &str) -> usize {
        shard_for(key, self.shard_count)
    }

    /// Return the backend of a service port, creating and registering it if missing.
    pub fn acquire_backend(&mut self, namespace: &str, name: &str, port: &str) -> &mut Backend {
        let key = build_id(namespace, name, port);
        if !self.items.contains_key(&key) {
            let mut backend = Backend::new(namespace, name, port);
            backend.shard = self.shard_of(&key);
            tracing::debug!(backend = %key, shard = backend.shard, "Acquired new backend");
            self.shards[backend.shard].insert(key.clone());
            self.items_add.insert(key.clone());
            self.items.insert(key.clone(), backend);
        }
        self.items.entry(key).or_default()
    }

    pub fn find_backend(&self, namespace: &str, name: &str, port: &str) -> Option<&Backend> {
        self.items.get(&build_id(namespace, name, port))
    }

    pub fn get(&self, name: &str) -> Option<&Backend> {
        self.items.get(name)
    }

    /// Remove backends by ID, recording their snapshot as removed.
    /// A repeated removal replaces the pending snapshot. IDs not in the
    /// store are ignored.
    pub fn remove_all(&mut self, ids: &[BackendId]) {
        for id in ids {
            let key = id.to_string();
            if let Some(backend) = self.items.remove(&key) {
                tracing::debug!(backend = %key, shard = backend.shard, "Removed backend");
                if let Some(shard) = self.shards.get_mut(backend.shard) {
                    shard.remove(&key);
                }
                self.items_base.entry(key.clone()).or_insert_with(|| backend.clone());
                self.items_del.insert(key, backend);
            }
        }
    }

    /// Cancel names that were both added and removed since the last commit.
    ///
    /// Names only added or only removed stay pending. A cancelled pair whose
    /// snapshots differ is remembered in [`Backends::items_modified`].
    pub fn shrink(&mut self) {
        let both: Vec<String> = self
            .items_add
            .iter()
            .filter(|name| self.items_del.contains_key(*name))
            .cloned()
            .collect();
        for name in both {
            self.items_add.remove(&name);
            let latest = self.items_del.remove(&name);
            let removed = self.items_base.remove(&name).or(latest);
            // added then removed within the cycle: nothing left to render
            let Some(current) = self.items.get(&name) else {
                continue;
            };
            if !backends_match(Some(current), removed.as_ref()) {
                self.shards_mod.insert(current.shard);
                self.shards_mod.extend(removed.map(|b| b.shard));
                self.items_mod.insert(name);
            }
        }
    }

    /// End a cycle: forget additions, removals and modifications.
    pub fn commit(&mut self) {
        self.items_add.clear();
        self.items_del.clear();
        self.items_base.clear();
        self.items_mod.clear();
        self.shards_mod.clear();
    }

    /// True if anything is pending since the last commit.
    pub fn changed(&self) -> bool {
        !self.items_add.is_empty()
            || !self.items_del.is_empty()
            || !self.items_mod.is_empty()
            || !self.shards_mod.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Committed backends, unordered.
    pub fn items(&self) -> impl Iterator<Item = &Backend> {
        self.items.values()
    }

    /// Committed backends sorted by name.
    pub fn sorted_items(&self) -> Vec<&Backend> {
        let mut items: Vec<&Backend> = self.items.values().collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        items
    }

    /// Names added since the last commit, sorted.
    pub fn items_add(&self) -> Vec<&str> {
        sorted(self.items_add.iter())
    }

    /// Names removed since the last commit, sorted.
    pub fn items_del(&self) -> Vec<&str> {
        sorted(self.items_del.keys())
    }

    /// Snapshot of a backend removed since the last commit.
    pub fn removed(&self, name: &str) -> Option<&Backend> {
        self.items_del.get(name)
    }

    /// Names whose add/remove pair was cancelled but whose content changed.
    pub fn items_modified(&self) -> Vec<&str> {
        self.items_mod.iter().map(String::as_str).collect()
    }

    /// Sorted member names of a shard; empty for an unknown index.
    pub fn shard_names(&self, shard: usize) -> Vec<&str> {
        self.shards.get(shard).map(|s| sorted(s.iter())).unwrap_or_default()
    }

    /// Number of shard member sets, 1 when sharding is disabled.
    pub fn shard_sets(&self) -> usize {
        self.shards.len()
    }

    /// Sorted indexes of shards touched since the last commit.
    pub fn changed_shards(&self) -> Vec<usize> {
        let mut changed = self.shards_mod.clone();
        for name in self.items_add.iter().chain(self.items_mod.iter()) {
            changed.insert(self.shard_of(name));
        }
        for backend in self.items_del.values() {
            changed.insert(backend.shard);
        }
        // snapshots taken before a reshard may point past the new layout
        changed.into_iter().filter(|s| *s < self.shards.len()).collect()
    }

    /// Move every backend to the shard of a new shard count.
    ///
    /// Each current item is recorded as removed and re-added, and every shard
    /// of the new layout is reported as changed until the next commit.
    pub fn reshard(&mut self, shard_count: usize) {
        if shard_count == self.shard_count {
            return;
        }
        tracing::info!(from = self.shard_count, to = shard_count, backends = self.items.len(), "Resharding backends");
        self.shard_count = shard_count;
        self.shards = vec![HashSet::new(); shard_count.max(1)];
        self.shards_mod.extend(0..self.shards.len());
        for (name, backend) in self.items.iter_mut() {
            self.items_base
                .entry(name.clone())
                .or_insert_with(|| backend.clone());
            self.items_del.insert(name.clone(), backend.clone());
            backend.shard = shard_for(name, shard_count);
            self.shards[backend.shard].insert(name.clone());
            self.items_add.insert(name.clone());
        }
    }
}

fn shard_for(key: &str, shard_count: usize) -> usize {
    if shard_count == 0 {
        return 0;
    }
    let mut hasher = FnvHasher::default();
    hasher.write(key.as_bytes());
    (hasher.finish() % shard_count as u64) as usize
}

fn sorted<'a>(names: impl Iterator<Item = &'a String>) -> Vec<&'a str> {
    let mut names: Vec<&str> = names.map(String::as_str).collect();
    names.sort_unstable();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::endpoint::Endpoint;

    fn split(name: &str) -> (String, String, String) {
        let p: Vec<&str> = name.split('_').collect();
        (p[0].to_string(), p[1].to_string(), p[2].to_string())
    }

    struct Case {
        shards: usize,
        add: Vec<&'static str>,
        del: Vec<&'static str>,
        expected: Vec<&'static str>,
        exp_add: Vec<&'static str>,
        exp_del: Vec<&'static str>,
        exp_shards: Vec<Vec<&'static str>>,
    }

    #[test]
    fn test_backend_crud() {
        let cases = vec![
            Case {
                shards: 0,
                add: vec![],
                del: vec![],
                expected: vec![],
                exp_add: vec![],
                exp_del: vec![],
                exp_shards: vec![vec![]],
            },
            Case {
                shards: 0,
                add: vec!["default_app_8080"],
                del: vec![],
                expected: vec!["default_app_8080"],
                exp_add: vec!["default_app_8080"],
                exp_del: vec![],
                exp_shards: vec![vec!["default_app_8080"]],
            },
            Case {
                shards: 0,
                add: vec!["default_app_8080"],
                del: vec!["default_app_8080"],
                expected: vec![],
                exp_add: vec!["default_app_8080"],
                exp_del: vec!["default_app_8080"],
                exp_shards: vec![vec![]],
            },
            Case {
                shards: 0,
                add: vec!["default_app1_8080", "default_app2_8080"],
                del: vec!["default_app1_8080"],
                expected: vec!["default_app2_8080"],
                exp_add: vec!["default_app1_8080", "default_app2_8080"],
                exp_del: vec!["default_app1_8080"],
                exp_shards: vec![vec!["default_app2_8080"]],
            },
            Case {
                shards: 3,
                add: vec!["default_app1_8080", "default_app2_8080", "default_app3_8080", "default_app4_8080"],
                del: vec![],
                expected: vec!["default_app1_8080", "default_app2_8080", "default_app3_8080", "default_app4_8080"],
                exp_add: vec!["default_app1_8080", "default_app2_8080", "default_app3_8080", "default_app4_8080"],
                exp_del: vec![],
                exp_shards: vec![
                    vec!["default_app1_8080", "default_app4_8080"],
                    vec!["default_app2_8080", "default_app3_8080"],
                    vec![],
                ],
            },
            Case {
                shards: 3,
                add: vec!["default_app1_8080", "default_app2_8080", "default_app3_8080", "default_app4_8080"],
                del: vec!["default_app1_8080", "default_app2_8080"],
                expected: vec!["default_app3_8080", "default_app4_8080"],
                exp_add: vec!["default_app1_8080", "default_app2_8080", "default_app3_8080", "default_app4_8080"],
                exp_del: vec!["default_app1_8080", "default_app2_8080"],
                exp_shards: vec![vec!["default_app4_8080"], vec!["default_app3_8080"], vec![]],
            },
        ];
        for (i, case) in cases.into_iter().enumerate() {
            let mut backends = Backends::new(case.shards);
            for add in &case.add {
                let (ns, name, port) = split(add);
                backends.acquire_backend(&ns, &name, &port);
            }
            let ids: Vec<BackendId> = case
                .del
                .iter()
                .filter_map(|del| {
                    let (ns, name, port) = split(del);
                    backends.find_backend(&ns, &name, &port).map(|b| b.backend_id())
                })
                .collect();
            backends.remove_all(&ids);

            let items: Vec<&str> = backends.sorted_items().iter().map(|b| b.name.as_str()).collect();
            assert_eq!(items, case.expected, "items on case {}", i);
            assert_eq!(backends.items_add(), case.exp_add, "items_add on case {}", i);
            assert_eq!(backends.items_del(), case.exp_del, "items_del on case {}", i);
            let shards: Vec<Vec<&str>> = (0..backends.shard_sets()).map(|s| backends.shard_names(s)).collect();
            assert_eq!(shards, case.exp_shards, "shards on case {}", i);
        }
    }

    #[test]
    fn test_acquire_is_get_or_create() {
        let mut backends = Backends::new(0);
        backends
            .acquire_backend("default", "app", "8080")
            .acquire_endpoint(Endpoint::from_ip("10.0.0.1", 8080));
        let again = backends.acquire_backend("default", "app", "8080");
        assert_eq!(again.endpoints.len(), 1);
        assert_eq!(backends.len(), 1);
        assert_eq!(backends.items_add(), vec!["default_app_8080"]);
    }

    #[test]
    fn test_find_has_no_side_effects() {
        let backends = Backends::new(2);
        assert!(backends.find_backend("default", "app", "8080").is_none());
        assert!(backends.is_empty());
        assert!(!backends.changed());
    }

    #[test]
    fn test_remove_absent_is_ignored() {
        let mut backends = Backends::new(0);
        backends.acquire_backend("default", "app", "8080");
        backends.remove_all(&[BackendId::new("default", "other", "8080")]);
        assert_eq!(backends.len(), 1);
        assert!(backends.items_del().is_empty());
    }

    #[test]
    fn test_shard_is_stable() {
        let mut backends = Backends::new(5);
        let first = backends.acquire_backend("default", "app", "8080").shard;
        backends.remove_all(&[BackendId::new("default", "app", "8080")]);
        let second = backends.acquire_backend("default", "app", "8080").shard;
        assert_eq!(first, second);
        assert_eq!(first, backends.shard_of("default_app_8080"));
        assert!(first < 5);
        let members: usize = (0..backends.shard_sets()).map(|s| backends.shard_names(s).len()).sum();
        assert_eq!(members, backends.len());
    }

    fn with_endpoints(name: &str, ips: &[&str]) -> Backend {
        let (ns, svc, port) = split(name);
        let mut b = Backend::new(&ns, &svc, &port);
        for ip in ips {
            b.acquire_endpoint(Endpoint::from_ip(*ip, 8080));
        }
        b
    }

    #[test]
    fn test_shrink_backends() {
        struct Case {
            add: Vec<Backend>,
            del: Vec<Backend>,
            exp_add: Vec<&'static str>,
            exp_del: Vec<&'static str>,
            exp_mod: Vec<&'static str>,
        }
        let app11 = with_endpoints("default_app1_8080", &["192.168.0.11"]);
        let app12 = with_endpoints("default_app1_8080", &["192.168.0.11", "127.0.0.1"]);
        let app21 = with_endpoints("default_app2_8080", &["192.168.0.21"]);
        let cases = vec![
            Case { add: vec![], del: vec![], exp_add: vec![], exp_del: vec![], exp_mod: vec![] },
            Case {
                add: vec![app11.clone()],
                del: vec![],
                exp_add: vec!["default_app1_8080"],
                exp_del: vec![],
                exp_mod: vec![],
            },
            Case { add: vec![app11.clone()], del: vec![app11.clone()], exp_add: vec![], exp_del: vec![], exp_mod: vec![] },
            Case {
                add: vec![app11.clone(), app21.clone()],
                del: vec![app21.clone()],
                exp_add: vec!["default_app1_8080"],
                exp_del: vec![],
                exp_mod: vec![],
            },
            Case {
                add: vec![app11.clone()],
                del: vec![app11.clone(), app21.clone()],
                exp_add: vec![],
                exp_del: vec!["default_app2_8080"],
                exp_mod: vec![],
            },
            Case {
                add: vec![app11.clone()],
                del: vec![app12.clone()],
                exp_add: vec![],
                exp_del: vec![],
                exp_mod: vec!["default_app1_8080"],
            },
        ];
        for (i, case) in cases.into_iter().enumerate() {
            let mut b = Backends::new(0);
            for add in case.add {
                b.items_add.insert(add.name.clone());
                b.shards[0].insert(add.name.clone());
                b.items.insert(add.name.clone(), add);
            }
            for del in case.del {
                b.items_del.insert(del.name.clone(), del);
            }
            b.shrink();
            assert_eq!(b.items_add(), case.exp_add, "add on case {}", i);
            assert_eq!(b.items_del(), case.exp_del, "del on case {}", i);
            assert_eq!(b.items_modified(), case.exp_mod, "mod on case {}", i);
        }
    }

    #[test]
    fn test_repeated_remove_keeps_latest_snapshot() {
        let mut backends = Backends::new(0);
        backends.acquire_backend("default", "app", "8080");
        backends.commit();

        let id = BackendId::new("default", "app", "8080");
        backends.remove_all(std::slice::from_ref(&id));
        backends
            .acquire_backend("default", "app", "8080")
            .custom_config
            .push("second".to_string());
        backends.remove_all(std::slice::from_ref(&id));
        assert_eq!(
            backends.removed("default_app_8080").map(|b| b.custom_config.clone()),
            Some(vec!["second".to_string()])
        );
        assert_eq!(backends.items_del(), vec!["default_app_8080"]);

        // re-added as committed: compared against the committed snapshot
        backends.acquire_backend("default", "app", "8080");
        backends.shrink();
        assert!(backends.items_modified().is_empty());
        assert!(!backends.changed());
    }

    #[test]
    fn test_add_then_remove_cancels() {
        let mut backends = Backends::new(3);
        backends.acquire_backend("default", "app", "8080");
        backends.remove_all(&[BackendId::new("default", "app", "8080")]);
        backends.shrink();
        assert!(backends.items_add().is_empty());
        assert!(backends.items_del().is_empty());
        assert!(backends.items_modified().is_empty());
        assert!(!backends.changed());
    }

    #[test]
    fn test_changed_shards_and_commit() {
        let mut backends = Backends::new(3);
        for app in ["app1", "app2", "app3", "app4"] {
            backends.acquire_backend("default", app, "8080");
        }
        assert_eq!(backends.changed_shards(), vec![0, 1]);
        backends.commit();
        assert!(!backends.changed());
        assert!(backends.changed_shards().is_empty());

        backends.remove_all(&[BackendId::new("default", "app3", "8080")]);
        assert_eq!(backends.changed_shards(), vec![1]);
        backends.commit();

        // re-observed with a new endpoint: cancelled but modified
        let old = backends.find_backend("default", "app4", "8080").map(|b| b.backend_id());
        backends.remove_all(&old.into_iter().collect::<Vec<_>>());
        backends
            .acquire_backend("default", "app4", "8080")
            .acquire_endpoint(Endpoint::from_ip("10.0.0.4", 8080));
        backends.shrink();
        assert_eq!(backends.items_modified(), vec!["default_app4_8080"]);
        assert_eq!(backends.changed_shards(), vec![0]);
        assert!(backends.changed());
    }

    #[test]
    fn test_reshard() {
        let mut backends = Backends::new(3);
        for app in ["app1", "app2", "app3", "app4"] {
            backends.acquire_backend("default", app, "8080");
        }
        backends.commit();
        backends.reshard(3);
        assert!(!backends.changed());

        backends.reshard(0);
        assert_eq!(backends.shard_count(), 0);
        assert_eq!(backends.shard_sets(), 1);
        assert_eq!(backends.shard_names(0).len(), 4);
        assert_eq!(backends.items_add().len(), 4);
        assert_eq!(backends.items_del().len(), 4);
        assert!(backends.sorted_items().iter().all(|b| b.shard == 0));
        assert_eq!(backends.removed("default_app2_8080").map(|b| b.shard), Some(1));

        backends.shrink();
        assert_eq!(backends.items_modified(), vec!["default_app2_8080", "default_app3_8080"]);
        assert_eq!(backends.changed_shards(), vec![0]);
        backends.commit();

        backends.reshard(3);
        assert_eq!(backends.changed_shards(), vec![0, 1, 2]);
        assert_eq!(backends.shard_names(2), Vec::<&str>::new());
    }
}
