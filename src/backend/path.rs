//! Path match rules of a backend.
//!
//! # Responsibilities
//! - Identify a rule by hostname and path prefix (`PathLink`)
//! - Carry per-path configuration overrides
//! - Keep the path list most-specific-first
//!
//! # Design Decisions
//! - The proxy takes the first matching rule, so longer paths go first
//! - Equal-length paths keep their insertion order (stable sort)
//! - IDs are assigned once and survive reorders

use serde::{Deserialize, Serialize};
use std::fmt;

/// Routing match key of a path rule: domain plus path prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathLink {
    pub hostname: String,
    pub path: String,
}

impl PathLink {
    pub fn new(hostname: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for PathLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.hostname, self.path)
    }
}

/// HTTP Strict Transport Security policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hsts {
    pub enabled: bool,
    pub max_age: u64,
    pub subdomains: bool,
    pub preload: bool,
}

/// One path rule inside a backend.
///
/// Override fields default to their unset value: `false`, a disabled
/// [`Hsts`], `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendPath {
    /// Sequential identifier, `path01`, `path02`, ...
    pub id: String,
    pub link: PathLink,
    pub ssl_redirect: bool,
    pub hsts: Hsts,
    /// Source CIDRs allowed to reach this path. `None` and an empty list
    /// both mean no restriction.
    pub whitelist_http: Option<Vec<String>>,
    /// Request body limit in bytes.
    pub max_body_size: Option<u64>,
}

impl BackendPath {
    pub fn new(id: impl Into<String>, link: PathLink) -> Self {
        Self {
            id: id.into(),
            link,
            ..Default::default()
        }
    }
}

/// Format the sequential path ID; at least two digits.
pub(crate) fn path_id(seq: u32) -> String {
    format!("path{:02}", seq)
}

/// Sort paths by descending path length, keeping insertion order on ties.
pub(crate) fn sort_paths(paths: &mut [BackendPath]) {
    paths.sort_by(|a, b| b.link.path.len().cmp(&a.link.path.len()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_id_padding() {
        assert_eq!(path_id(1), "path01");
        assert_eq!(path_id(12), "path12");
        assert_eq!(path_id(123), "path123");
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let mut paths = vec![
            BackendPath::new("path01", PathLink::new("d1.local", "/a")),
            BackendPath::new("path02", PathLink::new("d1.local", "/app/admin")),
            BackendPath::new("path03", PathLink::new("d1.local", "/b")),
            BackendPath::new("path04", PathLink::new("d2.local", "/a")),
        ];
        sort_paths(&mut paths);
        let ids: Vec<&str> = paths.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["path02", "path01", "path03", "path04"]);
    }
}
