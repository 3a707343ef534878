// src/core/registry.rs

//! The coordinator's node registry: two persistent maps, one per node
//! type, from target (`host:port`) to last-registration timestamp.

use crate::core::errors::CoreResult;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeType {
    ConfigManager,
    RemoteModelPuller,
}

/// A single node type's registry, persisted to a local JSON file cache
/// (`.registered_config_manager_cache` / `.registered_remote_model_puller_cache`)
/// so that a coordinator restart does not immediately evict every live
/// node.
pub struct NodeRegistry {
    node_type: NodeType,
    cache_path: PathBuf,
    targets: DashMap<String, DateTime<Utc>>,
}

impl NodeRegistry {
    pub fn new(node_type: NodeType, cache_path: PathBuf) -> Self {
        NodeRegistry {
            node_type,
            cache_path,
            targets: DashMap::new(),
        }
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    /// Loads the persisted cache from disk, if present. A missing file is
    /// not an error; it just means a fresh registry.
    pub async fn load(&self) -> CoreResult<()> {
        let bytes = match tokio::fs::read(&self.cache_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let restored: std::collections::HashMap<String, DateTime<Utc>> =
            serde_json::from_slice(&bytes).map_err(anyhow::Error::from)?;
        for (target, ts) in restored {
            self.targets.insert(target, ts);
        }
        Ok(())
    }

    async fn persist(&self) -> CoreResult<()> {
        let snapshot: std::collections::HashMap<String, DateTime<Utc>> = self
            .targets
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        let bytes = serde_json::to_vec_pretty(&snapshot).map_err(anyhow::Error::from)?;
        tokio::fs::write(&self.cache_path, bytes).await?;
        Ok(())
    }

    pub async fn register(&self, target: &str) -> CoreResult<()> {
        self.targets.insert(target.to_string(), Utc::now());
        self.persist().await
    }

    pub async fn deregister(&self, target: &str) -> CoreResult<()> {
        self.targets.remove(target);
        self.persist().await
    }

    /// Removes `target` without persisting synchronously on the fan-out hot
    /// path; callers that evict during a scatter-gather persist once at the
    /// end of the pass via [`NodeRegistry::persist_now`].
    pub fn evict_in_memory(&self, target: &str) {
        self.targets.remove(target);
    }

    pub async fn persist_now(&self) -> CoreResult<()> {
        self.persist().await
    }

    pub fn targets(&self) -> Vec<String> {
        self.targets.iter().map(|e| e.key().clone()).collect()
    }

    pub fn snapshot(&self) -> std::collections::HashMap<String, DateTime<Utc>> {
        self.targets
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }
}

pub fn default_cache_path(base_dir: &Path, node_type: NodeType) -> PathBuf {
    let filename = match node_type {
        NodeType::ConfigManager => ".registered_config_manager_cache",
        NodeType::RemoteModelPuller => ".registered_remote_model_puller_cache",
    };
    base_dir.join(filename)
}
