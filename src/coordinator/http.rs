// src/coordinator/http.rs

//! HTTP surface for the coordinator: registry membership, cluster state
//! aggregation, and operator commands fanned out to every registered
//! node.

use crate::core::errors::{ApiError, CoreError};
use crate::core::metrics::{gather_metrics, REGISTERED_NODES};
use crate::core::registry::NodeType;
use crate::coordinator::fanout::{fan_out, FanOutResult};
use crate::coordinator::state::CoordinatorState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub fn router(state: Arc<CoordinatorState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/health/ping", get(health))
        .route("/ping", get(health))
        .route("/register", post(register).delete(deregister))
        .route("/report_cluster_state", get(report_cluster_state))
        .route("/models/{framework}/{name}", delete(delete_model))
        .route("/priority", post(set_priority).delete(delete_priority))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn root(State(state): State<Arc<CoordinatorState>>) -> impl IntoResponse {
    Json(json!({
        "environment": state.config.environment,
        "remote_model_directory": state.config.remote_model_directory,
        "config_managers": state.config_managers.snapshot(),
        "remote_model_pullers": state.remote_model_pullers.snapshot(),
    }))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"stale": false})))
}

#[derive(Deserialize)]
struct RegisterBody {
    node_type: NodeType,
    target: String,
}

fn registry_for<'a>(state: &'a CoordinatorState, node_type: NodeType) -> &'a crate::core::registry::NodeRegistry {
    match node_type {
        NodeType::ConfigManager => &state.config_managers,
        NodeType::RemoteModelPuller => &state.remote_model_pullers,
    }
}

async fn register(
    State(state): State<Arc<CoordinatorState>>,
    Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError> {
    if body.target.is_empty() {
        return Err(ApiError(CoreError::BadRequest("target must not be empty".into())));
    }
    registry_for(&state, body.node_type)
        .register(&body.target)
        .await
        .map_err(ApiError)?;
    REGISTERED_NODES.with_label_values(&[&body.node_type.to_string()]).inc();
    Ok(StatusCode::OK)
}

async fn deregister(
    State(state): State<Arc<CoordinatorState>>,
    Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError> {
    if body.target.is_empty() {
        return Err(ApiError(CoreError::BadRequest("target must not be empty".into())));
    }
    registry_for(&state, body.node_type)
        .deregister(&body.target)
        .await
        .map_err(ApiError)?;
    Ok(StatusCode::OK)
}

fn results_to_json(results: Vec<(String, FanOutResult)>) -> Value {
    let mut out = serde_json::Map::new();
    for (target, result) in results {
        let value = match result {
            FanOutResult::Ok(v) => v,
            FanOutResult::Error(e) => json!({"error": e}),
            FanOutResult::TimedOut => json!({"error": "timeout"}),
        };
        out.insert(target, value);
    }
    Value::Object(out)
}

async fn report_cluster_state(State(state): State<Arc<CoordinatorState>>) -> impl IntoResponse {
    let pullers = fan_out(&state.http_client, &state.remote_model_pullers, Method::GET, "/", None).await;
    let synchronizers = fan_out(&state.http_client, &state.config_managers, Method::GET, "/", None).await;
    Json(json!({
        "remote_model_pullers": results_to_json(pullers),
        "config_managers": results_to_json(synchronizers),
    }))
}

async fn delete_model(
    State(state): State<Arc<CoordinatorState>>,
    Path((framework, name)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let prefix = format!("{}/{}/{}/", state.config.remote_model_directory, framework, name);
    let blobs = state.blob_store.list(&prefix).await.map_err(ApiError)?;
    state.blob_store.delete_many(&blobs).await.map_err(ApiError)?;

    let path = format!("/models/{framework}/{name}");
    let _ = fan_out(&state.http_client, &state.remote_model_pullers, Method::DELETE, &path, None).await;
    let _ = fan_out(&state.http_client, &state.config_managers, Method::DELETE, &path, None).await;
    Ok(StatusCode::OK)
}

#[derive(Deserialize)]
struct PriorityBody {
    #[serde(default)]
    framework: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: String,
}

async fn set_priority(
    State(state): State<Arc<CoordinatorState>>,
    Json(body): Json<PriorityBody>,
) -> Result<impl IntoResponse, ApiError> {
    if body.framework.is_empty() || body.name.is_empty() || body.version.is_empty() {
        return Err(ApiError(CoreError::BadRequest(
            "framework, name, and version are all required".into(),
        )));
    }
    let src_prefix = format!(
        "{}/{}/{}/{}/",
        state.config.remote_model_directory, body.framework, body.name, body.version
    );
    let blobs = state.blob_store.list(&src_prefix).await.map_err(ApiError)?;
    for blob in &blobs {
        let Some(suffix) = blob.name.strip_prefix(&src_prefix) else { continue };
        let dst_name = format!(
            "{}/{}/{}/0/{}",
            state.config.remote_model_directory, body.framework, body.name, suffix
        );
        // best-effort: a single blob failing to copy does not abort the rest
        let _ = state.blob_store.copy(blob, &dst_name).await;
    }

    let _ = fan_out(&state.http_client, &state.remote_model_pullers, Method::POST, "/pull", None).await;
    let _ = fan_out(
        &state.http_client,
        &state.config_managers,
        Method::POST,
        "/update_tfserving_config_from_local_filesystem",
        None,
    )
    .await;
    Ok(StatusCode::OK)
}

async fn delete_priority(
    State(state): State<Arc<CoordinatorState>>,
    Json(body): Json<PriorityBody>,
) -> Result<impl IntoResponse, ApiError> {
    if body.framework.is_empty() || body.name.is_empty() {
        return Err(ApiError(CoreError::BadRequest("framework and name are required".into())));
    }
    let prefix = format!("{}/{}/{}/0/", state.config.remote_model_directory, body.framework, body.name);
    let blobs = state.blob_store.list(&prefix).await.map_err(ApiError)?;
    state.blob_store.delete_many(&blobs).await.map_err(ApiError)?;

    let fanout_body = json!({"framework": body.framework, "name": body.name});
    let _ = fan_out(&state.http_client, &state.config_managers, Method::DELETE, "/priority", Some(&fanout_body)).await;
    Ok(StatusCode::OK)
}

async fn metrics() -> impl IntoResponse {
    gather_metrics()
}
