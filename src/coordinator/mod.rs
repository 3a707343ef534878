// src/coordinator/mod.rs

//! The coordinator: the cluster's single registry endpoint, fanning out
//! operator commands to every registered node.

pub mod fanout;
pub mod http;
pub mod state;

use crate::config::CoordinatorConfig;
use crate::core::blobstore::gcs::GcsBlobStore;
use crate::core::blobstore::BlobStore;
use anyhow::Result;
use state::CoordinatorState;
use std::sync::Arc;
use tracing::info;

pub async fn run(config: CoordinatorConfig) -> Result<()> {
    let blob_store: Arc<dyn BlobStore> =
        Arc::new(GcsBlobStore::new(config.gcs_bucket.clone(), config.gcs_access_token.clone())?);
    let state = CoordinatorState::new(config, blob_store).await?;

    let addr = format!("{}:{}", state.config.http_host, state.config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr, "coordinator HTTP surface listening");
    axum::serve(listener, http::router(state)).await?;
    Ok(())
}
