//! Per-path configuration aggregation.
//!
//! # Responsibilities
//! - Group a backend's paths by the value of each configurable field
//! - Keep group order aligned with path order
//!
//! # Design Decisions
//! - Not a global group-by: a group only extends while the value repeats,
//!   so ACL fragments keep the most-specific-first evaluation order
//! - Unset values group like any other value
//! - An empty list and a missing list are the same configuration

use serde::Serialize;

use crate::backend::backend::Backend;
use crate::backend::path::{BackendPath, Hsts};

/// A configurable per-path value.
pub trait PathConfigValue: Clone + PartialEq {
    /// True when the value means "no configuration".
    fn is_unset(&self) -> bool;

    /// Equality used for grouping. Distinct representations of "unset"
    /// compare equal.
    fn config_eq(&self, other: &Self) -> bool {
        (self.is_unset() && other.is_unset()) || self == other
    }
}

impl PathConfigValue for bool {
    fn is_unset(&self) -> bool {
        !*self
    }
}

impl PathConfigValue for Hsts {
    fn is_unset(&self) -> bool {
        *self == Hsts::default()
    }
}

impl PathConfigValue for Option<u64> {
    fn is_unset(&self) -> bool {
        self.is_none()
    }
}

impl PathConfigValue for Option<Vec<String>> {
    fn is_unset(&self) -> bool {
        self.as_ref().map_or(true, |v| v.is_empty())
    }
}

/// Paths sharing one value of a field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathConfigItem<T> {
    pub path_ids: Vec<String>,
    pub config: T,
}

/// Ordered groups of one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathConfig<T> {
    items: Vec<PathConfigItem<T>>,
}

impl<T> Default for PathConfig<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: PathConfigValue> PathConfig<T> {
    fn push(&mut self, path_id: &str, value: &T) {
        if let Some(last) = self.items.last_mut() {
            if last.config.config_eq(value) {
                last.path_ids.push(path_id.to_string());
                return;
            }
        }
        self.items.push(PathConfigItem {
            path_ids: vec![path_id.to_string()],
            config: value.clone(),
        });
    }

    pub fn items(&self) -> &[PathConfigItem<T>] {
        &self.items
    }

    /// True when paths disagree on this field, so the renderer needs one
    /// condition per group instead of a backend-wide setting.
    pub fn need_acl(&self) -> bool {
        self.items.len() > 1
    }
}

/// Grouped configuration of every per-path field of a backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BackendPathConfig {
    pub ssl_redirect: PathConfig<bool>,
    pub hsts: PathConfig<Hsts>,
    pub whitelist_http: PathConfig<Option<Vec<String>>>,
    pub max_body_size: PathConfig<Option<u64>>,
}

impl BackendPathConfig {
    /// Field names in emission order.
    pub const FIELDS: [&'static str; 4] = ["ssl_redirect", "hsts", "whitelist_http", "max_body_size"];

    fn push(&mut self, path: &BackendPath) {
        self.ssl_redirect.push(&path.id, &path.ssl_redirect);
        self.hsts.push(&path.id, &path.hsts);
        self.whitelist_http.push(&path.id, &path.whitelist_http);
        self.max_body_size.push(&path.id, &path.max_body_size);
    }

    /// Fields whose paths disagree.
    pub fn acl_fields(&self) -> Vec<&'static str> {
        let needs = [
            self.ssl_redirect.need_acl(),
            self.hsts.need_acl(),
            self.whitelist_http.need_acl(),
            self.max_body_size.need_acl(),
        ];
        Self::FIELDS
            .iter()
            .zip(needs)
            .filter_map(|(name, need)| need.then_some(*name))
            .collect()
    }
}

impl Backend {
    /// Group this backend's paths, in stored order, by each configurable field.
    pub fn create_path_config(&self) -> BackendPathConfig {
        let mut config = BackendPathConfig::default();
        for path in &self.paths {
            config.push(path);
        }
        config
    }
}
