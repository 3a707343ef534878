// src/puller/mod.rs

//! The artifact puller: owns a node's local model directory, periodically
//! reconciling it against the remote object store.

pub mod fetch;
pub mod http;
pub mod reconcile;
pub mod state;

use crate::config::PullerConfig;
use crate::core::blobstore::BlobStore;
use crate::core::blobstore::gcs::GcsBlobStore;
use crate::core::registry::NodeType;
use anyhow::Result;
use state::PullerState;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};

pub async fn run(config: PullerConfig) -> Result<()> {
    let blob_store: Arc<dyn BlobStore> =
        Arc::new(GcsBlobStore::new(config.gcs_bucket.clone(), config.gcs_access_token.clone())?);
    let state = PullerState::new(config, blob_store);
    let target = format!("{}:{}", state.config.http_host, state.config.http_port);

    let mut tasks = JoinSet::new();

    let register_state = state.clone();
    tasks.spawn(async move {
        crate::core::coordinator_client::register(
            &register_state.http_client,
            &register_state.config.master_url,
            NodeType::RemoteModelPuller,
            &target,
        )
        .await;
        Ok::<(), anyhow::Error>(())
    });

    let loop_state = state.clone();
    tasks.spawn(async move { reconciliation_loop(loop_state).await });

    let server_state = state.clone();
    tasks.spawn(async move { serve_http(server_state).await });

    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(error = %e, "puller background task exited with error");
                return Err(e);
            }
            Err(e) => {
                error!(error = %e, "puller background task panicked");
                return Err(e.into());
            }
        }
    }
    Ok(())
}

async fn reconciliation_loop(state: Arc<PullerState>) -> Result<()> {
    let mut ticker = tokio::time::interval(state.config.remote_model_pull_frequency);
    loop {
        ticker.tick().await;
        let outcome = reconcile::run_pass(&state).await;
        if let Some(err) = outcome.first_error {
            error!(error = %err, "puller reconciliation pass failed, will retry next tick");
        } else {
            info!(processed = outcome.processed, "puller reconciliation pass complete");
        }
    }
}

async fn serve_http(state: Arc<PullerState>) -> Result<()> {
    let addr = format!("{}:{}", state.config.http_host, state.config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr, "puller HTTP surface listening");
    axum::serve(listener, http::router(state)).await?;
    Ok(())
}
