//! Renderer input for the shards a cycle changed.

use serde::Serialize;

use crate::backend::{Backend, BackendPathConfig, Backends};

/// One backend with its grouped per-path configuration.
#[derive(Debug, Serialize)]
pub struct BackendPlan<'a> {
    pub backend: &'a Backend,
    pub path_config: BackendPathConfig,
    /// Fields needing per-path conditions.
    pub acl_fields: Vec<&'static str>,
}

/// Members of one shard, sorted by name.
#[derive(Debug, Serialize)]
pub struct ShardPlan<'a> {
    pub shard: usize,
    pub backends: Vec<BackendPlan<'a>>,
}

/// Build the renderer input of the given shards.
pub fn render_plan<'a>(backends: &'a Backends, shards: &[usize]) -> Vec<ShardPlan<'a>> {
    shards
        .iter()
        .map(|&shard| ShardPlan {
            shard,
            backends: backends
                .shard_names(shard)
                .into_iter()
                .filter_map(|name| backends.get(name))
                .map(|backend| {
                    let path_config = backend.create_path_config();
                    BackendPlan {
                        backend,
                        acl_fields: path_config.acl_fields(),
                        path_config,
                    }
                })
                .collect(),
        })
        .collect()
}
