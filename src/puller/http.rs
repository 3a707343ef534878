// src/puller/http.rs

//! HTTP surface for the artifact puller: pure read-views, a manual pull
//! trigger, deletion, and health/metrics.

use crate::core::errors::ApiError;
use crate::core::local_fs::{remove_local_dir, scan_local_records};
use crate::core::log_capture::capture;
use crate::core::metrics::gather_metrics;
use crate::core::record::{current_local_set, current_remote_set, RecordKey};
use crate::puller::reconcile::run_pass;
use crate::puller::state::PullerState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

pub fn router(state: Arc<PullerState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/local/all", get(local_all))
        .route("/local/current", get(local_current))
        .route("/remote/current", get(remote_current))
        .route("/pull", post(pull))
        .route("/models/{framework}/{name}", delete(delete_models))
        .route("/metrics", get(metrics))
        .with_state(state)
}

fn records_to_jsonable<T: Serialize>(map: &HashMap<RecordKey, T>) -> serde_json::Value {
    let mut nested: serde_json::Map<String, serde_json::Value> = serde_json::Map::new();
    for (key, value) in map {
        let framework_entry = nested
            .entry(key.framework.clone())
            .or_insert_with(|| json!({}));
        framework_entry
            .as_object_mut()
            .unwrap()
            .insert(key.name.clone(), serde_json::to_value(value).unwrap());
    }
    serde_json::Value::Object(nested)
}

async fn root(State(state): State<Arc<PullerState>>) -> impl IntoResponse {
    Json(json!({
        "environment": state.config.environment,
        "uptime_seconds": chrono::Utc::now().signed_duration_since(state.started_at).num_seconds(),
        "master_url": state.config.master_url,
        "local_model_directory": state.config.local_model_directory,
    }))
}

async fn health(State(state): State<Arc<PullerState>>) -> impl IntoResponse {
    crate::core::coordinator_client::register(
        &state.http_client,
        &state.config.master_url,
        crate::core::registry::NodeType::RemoteModelPuller,
        &format!("{}:{}", state.config.http_host, state.config.http_port),
    )
    .await;

    if state.is_stale() {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"stale": true}))).into_response();
    }
    (StatusCode::OK, Json(json!({"stale": false}))).into_response()
}

async fn local_all(State(state): State<Arc<PullerState>>) -> Result<impl IntoResponse, ApiError> {
    let records = scan_local_records(&state.config.local_model_directory)
        .await
        .map_err(ApiError)?;
    Ok(Json(records_to_jsonable(&records)))
}

async fn local_current(State(state): State<Arc<PullerState>>) -> Result<impl IntoResponse, ApiError> {
    let records = scan_local_records(&state.config.local_model_directory)
        .await
        .map_err(ApiError)?;
    let current = current_local_set(&records)
        .into_iter()
        .filter_map(|(k, v)| v.into_iter().next().map(|r| (k, vec![r])))
        .collect::<HashMap<_, _>>();
    Ok(Json(records_to_jsonable(&current)))
}

async fn remote_current(State(state): State<Arc<PullerState>>) -> Result<impl IntoResponse, ApiError> {
    let descriptors = state
        .blob_store
        .list(&state.config.remote_model_directory)
        .await
        .map_err(ApiError)?;
    let mut by_key: HashMap<RecordKey, Vec<crate::core::record::RemoteRecord>> = HashMap::new();
    for descriptor in descriptors {
        let Some([_env, framework, name, version_str, filename]) = descriptor.path_components() else {
            continue;
        };
        if filename != "model.tar.gz" {
            continue;
        }
        let Ok(version) = version_str.parse::<u64>() else {
            continue;
        };
        let key = RecordKey::new(framework, name);
        by_key
            .entry(key.clone())
            .or_default()
            .push(crate::core::record::RemoteRecord {
                record: crate::core::record::Record::new(key, version),
                remote_path: descriptor.name.clone(),
            });
    }
    let current = current_remote_set(&by_key)
        .into_iter()
        .map(|(k, r)| (k, vec![r]))
        .collect::<HashMap<_, _>>();
    Ok(Json(records_to_jsonable(&current)))
}

async fn pull(State(state): State<Arc<PullerState>>) -> impl IntoResponse {
    let (outcome, log_text) = capture(run_pass(&state)).await;
    let status = if outcome.is_success() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, log_text)
}

async fn delete_models(
    State(state): State<Arc<PullerState>>,
    Path((framework, name)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let key = RecordKey::new(framework, name);
    let records = scan_local_records(&state.config.local_model_directory)
        .await
        .map_err(ApiError)?;
    if let Some(versions) = records.get(&key) {
        for record in versions {
            remove_local_dir(&record.local_path).await.map_err(ApiError)?;
        }
    }
    Ok(StatusCode::OK)
}

async fn metrics() -> impl IntoResponse {
    gather_metrics()
}
