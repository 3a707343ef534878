// src/synchronizer/mod.rs

//! The serving-config synchronizer: owns the serving engine's text config
//! file, periodically adding newly-available local models and removing
//! directories the engine no longer considers current.

pub mod http;
pub mod priority;
pub mod reconcile;
pub mod state;

use crate::config::SynchronizerConfig;
use crate::core::engine_client::{EngineClient, GrpcEngineClient};
use crate::core::registry::NodeType;
use anyhow::Result;
use state::SynchronizerState;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};

pub async fn run(config: SynchronizerConfig) -> Result<()> {
    let engine_client: Arc<dyn EngineClient> =
        Arc::new(GrpcEngineClient::connect(&config.tensorflow_serving_grpc_target).await?);
    let state = SynchronizerState::new(config, engine_client);
    let target = format!("{}:{}", state.config.http_host, state.config.http_port);

    let mut tasks = JoinSet::new();

    let register_state = state.clone();
    tasks.spawn(async move {
        crate::core::coordinator_client::register(
            &register_state.http_client,
            &register_state.config.master_url,
            NodeType::ConfigManager,
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
                error!(error = %e, "synchronizer background task exited with error");
                return Err(e);
            }
            Err(e) => {
                error!(error = %e, "synchronizer background task panicked");
                return Err(e.into());
            }
        }
    }
    Ok(())
}

async fn reconciliation_loop(state: Arc<SynchronizerState>) -> Result<()> {
    let mut ticker = tokio::time::interval(state.config.config_update_frequency);
    loop {
        ticker.tick().await;
        let add_outcome = reconcile::config_reconcile_pass(&state).await;
        if let Some(err) = add_outcome.first_error {
            error!(error = %err, "synchronizer config-reconcile pass failed, will retry next tick");
        } else {
            info!(processed = add_outcome.processed, "config-reconcile pass complete");
        }

        let remove_outcome = reconcile::removal_pass(&state).await;
        if let Some(err) = remove_outcome.first_error {
            error!(error = %err, "synchronizer removal pass failed, will retry next tick");
        } else {
            info!(processed = remove_outcome.processed, "removal pass complete");
        }
    }
}

async fn serve_http(state: Arc<SynchronizerState>) -> Result<()> {
    let addr = format!("{}:{}", state.config.http_host, state.config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr, "synchronizer HTTP surface listening");
    axum::serve(listener, http::router(state)).await?;
    Ok(())
}
