use axum::response::Json;
use axum::routing::get;
use axum::Router;
use fleetmodeld::coordinator::fanout::fan_out;
use fleetmodeld::core::registry::{NodeRegistry, NodeType};
use reqwest::Method;
use serde_json::json;
use std::net::SocketAddr;
use tokio::net::TcpListener;

async fn spawn_responsive_node() -> SocketAddr {
    let router = Router::new().route("/", get(|| async { Json(json!({"ok": true})) }));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

async fn spawn_slow_node() -> SocketAddr {
    let router = Router::new().route(
        "/",
        get(|| async {
            tokio::time::sleep(std::time::Duration::from_secs(3)).await;
            Json(json!({"ok": true}))
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn fan_out_evicts_only_the_target_that_times_out() {
    let fast_addr = spawn_responsive_node().await;
    let slow_addr = spawn_slow_node().await;

    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join(".registered_remote_model_puller_cache");
    let registry = NodeRegistry::new(NodeType::RemoteModelPuller, cache_path);
    registry.register(&fast_addr.to_string()).await.unwrap();
    registry.register(&slow_addr.to_string()).await.unwrap();

    let http_client = reqwest::Client::new();
    let results = fan_out(&http_client, &registry, Method::GET, "/", None).await;
    assert_eq!(results.len(), 2);

    let remaining = registry.targets();
    assert_eq!(remaining, vec![fast_addr.to_string()]);
}
