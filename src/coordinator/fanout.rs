// src/coordinator/fanout.rs

//! Scatter-gather fan-out to every registered node, with a per-request
//! timeout and self-healing eviction: a target is only ever evicted when
//! its request times out, never on other errors.

use crate::core::metrics::REGISTRY_EVICTIONS_TOTAL;
use crate::core::registry::NodeRegistry;
use futures::future::join_all;
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

const FAN_OUT_TIMEOUT: Duration = Duration::from_secs(1);

pub enum FanOutResult {
    Ok(Value),
    Error(String),
    TimedOut,
}

async fn send_one(http_client: &reqwest::Client, method: Method, target: &str, path: &str, body: Option<&Value>) -> FanOutResult {
    let url = format!("http://{target}{path}");
    let mut request = http_client.request(method, &url).timeout(FAN_OUT_TIMEOUT);
    if let Some(body) = body {
        request = request.json(body);
    }
    match request.send().await {
        Ok(resp) => resp.json::<Value>().await.map(FanOutResult::Ok).unwrap_or(FanOutResult::Ok(Value::Null)),
        Err(e) if e.is_timeout() => FanOutResult::TimedOut,
        Err(e) => FanOutResult::Error(e.to_string()),
    }
}

/// Sends `method path` (with an optional JSON body) to every target
/// currently in `registry`, concurrently, evicting any target whose
/// request times out. Returns one result per target that was attempted.
pub async fn fan_out(
    http_client: &reqwest::Client,
    registry: &NodeRegistry,
    method: Method,
    path: &str,
    body: Option<&Value>,
) -> Vec<(String, FanOutResult)> {
    let targets = registry.targets();
    let futures = targets
        .iter()
        .map(|target| send_one(http_client, method.clone(), target, path, body));
    let outcomes = join_all(futures).await;

    let mut results = Vec::with_capacity(targets.len());
    for (target, outcome) in targets.into_iter().zip(outcomes) {
        if matches!(outcome, FanOutResult::TimedOut) {
            REGISTRY_EVICTIONS_TOTAL.inc();
            warn!(target, "fan-out request timed out, evicting from registry");
            registry.evict_in_memory(&target);
        } else if matches!(outcome, FanOutResult::Error(_)) {
            warn!(target, "fan-out request failed, not evicting");
        }
        results.push((target, outcome));
    }

    if let Err(e) = registry.persist_now().await {
        warn!(error = %e, "failed to persist registry after fan-out");
    }

    results
}
