// src/core/coordinator_client.rs

//! The small client pullers and synchronizers use to register themselves
//! with the coordinator, on startup and opportunistically on every health
//! check.

use crate::core::registry::NodeType;
use serde::Serialize;
use tracing::warn;

#[derive(Serialize)]
struct RegisterBody<'a> {
    node_type: NodeType,
    target: &'a str,
}

/// Best-effort: a failure to register is logged and otherwise ignored —
/// the next health check will try again.
pub async fn register(http_client: &reqwest::Client, master_url: &str, node_type: NodeType, target: &str) {
    let url = format!("{master_url}/register");
    let body = RegisterBody { node_type, target };
    if let Err(e) = http_client.post(&url).json(&body).send().await {
        warn!(error = %e, "failed to register with coordinator");
    }
}
