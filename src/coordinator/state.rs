// src/coordinator/state.rs

//! Shared process state for the coordinator: the two node registries and
//! the blob store used for operator-triggered priority and deletion
//! commands.

use crate::config::CoordinatorConfig;
use crate::core::blobstore::BlobStore;
use crate::core::registry::{default_cache_path, NodeRegistry, NodeType};
use std::sync::Arc;

pub struct CoordinatorState {
    pub config: CoordinatorConfig,
    pub http_client: reqwest::Client,
    pub blob_store: Arc<dyn BlobStore>,
    pub config_managers: NodeRegistry,
    pub remote_model_pullers: NodeRegistry,
}

impl CoordinatorState {
    pub async fn new(config: CoordinatorConfig, blob_store: Arc<dyn BlobStore>) -> anyhow::Result<Arc<Self>> {
        let config_managers = NodeRegistry::new(
            NodeType::ConfigManager,
            default_cache_path(&config.registry_cache_dir, NodeType::ConfigManager),
        );
        let remote_model_pullers = NodeRegistry::new(
            NodeType::RemoteModelPuller,
            default_cache_path(&config.registry_cache_dir, NodeType::RemoteModelPuller),
        );
        config_managers.load().await?;
        remote_model_pullers.load().await?;

        Ok(Arc::new(CoordinatorState {
            config,
            http_client: reqwest::Client::new(),
            blob_store,
            config_managers,
            remote_model_pullers,
        }))
    }
}
