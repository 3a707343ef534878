// src/synchronizer/http.rs

//! HTTP surface for the serving-config synchronizer.

use crate::core::engine_client::build_engine_view;
use crate::core::errors::ApiError;
use crate::core::local_fs::{remove_local_dir, scan_local_records};
use crate::core::log_capture::capture;
use crate::core::metrics::gather_metrics;
use crate::core::record::{current_local_set, RecordKey};
use crate::core::serving_config::{read_config, serialize, ConfigEntry};
use crate::synchronizer::priority::remove_priority;
use crate::synchronizer::reconcile::{config_reconcile_pass, removal_pass};
use crate::synchronizer::state::SynchronizerState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

pub fn router(state: Arc<SynchronizerState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/tensorflow_serving/config", get(serving_config_text))
        .route("/tensorflow_serving/all", get(serving_all))
        .route("/local/all", get(local_all))
        .route("/local/current", get(local_current))
        .route("/update_tfserving_config_from_local_filesystem", post(update_config))
        .route("/clear_out_of_date_local_models", post(clear_out_of_date))
        .route("/models/{framework}/{name}", delete(delete_model))
        .route("/priority", delete(delete_priority))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn root(State(state): State<Arc<SynchronizerState>>) -> impl IntoResponse {
    Json(json!({
        "environment": state.config.environment,
        "uptime_seconds": chrono::Utc::now().signed_duration_since(state.started_at).num_seconds(),
        "master_url": state.config.master_url,
        "tensorflow_serving_grpc_target": state.config.tensorflow_serving_grpc_target,
    }))
}

async fn health(State(state): State<Arc<SynchronizerState>>) -> impl IntoResponse {
    crate::core::coordinator_client::register(
        &state.http_client,
        &state.config.master_url,
        crate::core::registry::NodeType::ConfigManager,
        &format!("{}:{}", state.config.http_host, state.config.http_port),
    )
    .await;

    if state.is_stale() {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"stale": true}))).into_response();
    }
    (StatusCode::OK, Json(json!({"stale": false}))).into_response()
}

async fn serving_config_text(State(state): State<Arc<SynchronizerState>>) -> Result<impl IntoResponse, ApiError> {
    let (entries, _crc) = read_config(&state.config.tensorflow_serving_config_file)
        .await
        .map_err(ApiError)?;
    Ok(serialize(&entries))
}

fn records_to_jsonable<T: serde::Serialize>(map: &HashMap<RecordKey, T>) -> serde_json::Value {
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

async fn serving_all(State(state): State<Arc<SynchronizerState>>) -> Result<impl IntoResponse, ApiError> {
    let (entries, _crc) = read_config(&state.config.tensorflow_serving_config_file)
        .await
        .map_err(ApiError)?;
    let query_keys: Vec<RecordKey> = entries
        .iter()
        .map(|e: &ConfigEntry| RecordKey::new("tensorflow", e.name.clone()))
        .collect();
    let engine_view = build_engine_view(state.engine_client.as_ref(), query_keys).await;
    Ok(Json(records_to_jsonable(&engine_view)))
}

async fn local_all(State(state): State<Arc<SynchronizerState>>) -> Result<impl IntoResponse, ApiError> {
    let records = scan_local_records(&state.config.local_model_directory)
        .await
        .map_err(ApiError)?;
    Ok(Json(records_to_jsonable(&records)))
}

async fn local_current(State(state): State<Arc<SynchronizerState>>) -> Result<impl IntoResponse, ApiError> {
    let records = scan_local_records(&state.config.local_model_directory)
        .await
        .map_err(ApiError)?;
    let current = current_local_set(&records)
        .into_iter()
        .filter_map(|(k, v)| v.into_iter().next().map(|r| (k, vec![r])))
        .collect::<HashMap<_, _>>();
    Ok(Json(records_to_jsonable(&current)))
}

async fn update_config(State(state): State<Arc<SynchronizerState>>) -> impl IntoResponse {
    let (outcome, log_text) = capture(config_reconcile_pass(&state)).await;
    let status = if outcome.is_success() { StatusCode::OK } else { StatusCode::INTERNAL_SERVER_ERROR };
    (status, log_text)
}

async fn clear_out_of_date(State(state): State<Arc<SynchronizerState>>) -> impl IntoResponse {
    let (outcome, log_text) = capture(removal_pass(&state)).await;
    let status = if outcome.is_success() { StatusCode::OK } else { StatusCode::INTERNAL_SERVER_ERROR };
    (status, log_text)
}

async fn delete_model(
    State(state): State<Arc<SynchronizerState>>,
    Path((framework, name)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let key = RecordKey::new(framework, name);
    let (entries, observed_crc) = read_config(&state.config.tensorflow_serving_config_file)
        .await
        .map_err(ApiError)?;
    let filtered: Vec<_> = entries.into_iter().filter(|e| e.name != key.name).collect();
    crate::core::serving_config::write_config_guarded(
        &state.config.tensorflow_serving_config_file,
        observed_crc,
        &filtered,
    )
    .await
    .map_err(ApiError)?;

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

#[derive(Deserialize)]
struct PriorityBody {
    framework: String,
    name: String,
}

async fn delete_priority(
    State(state): State<Arc<SynchronizerState>>,
    Json(body): Json<PriorityBody>,
) -> impl IntoResponse {
    let key = RecordKey::new(body.framework, body.name);
    let (outcome, log_text) = capture(remove_priority(&state, &key)).await;
    let status = if outcome.is_success() { StatusCode::OK } else { StatusCode::INTERNAL_SERVER_ERROR };
    (status, log_text)
}

async fn metrics() -> impl IntoResponse {
    gather_metrics()
}
