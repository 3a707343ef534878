use super::test_helpers::{build_tar_gz_bytes, FakeBlobStore};
use fleetmodeld::config::{Environment, PullerConfig};
use fleetmodeld::puller::reconcile::run_pass;
use fleetmodeld::puller::state::PullerState;
use std::sync::Arc;
use std::time::Duration;

fn test_config(root: &std::path::Path) -> PullerConfig {
    PullerConfig {
        environment: Environment::Test,
        http_host: "127.0.0.1".to_string(),
        http_port: 0,
        http_workers: 1,
        master_url: "http://127.0.0.1:0".to_string(),
        remote_model_directory: "prod".to_string(),
        local_model_directory: root.join("local"),
        temporary_model_download_directory: root.join("scratch"),
        remote_model_pull_frequency: Duration::from_secs(30),
        gcs_bucket: "test-bucket".to_string(),
        gcs_access_token: "test-token".to_string(),
    }
}

#[tokio::test]
async fn empty_to_one_remote_pulls_the_remote_into_place() {
    let root = tempfile::tempdir().unwrap();
    tokio::fs::create_dir_all(root.path().join("scratch")).await.unwrap();
    let blob_store = Arc::new(FakeBlobStore::new());
    blob_store.put(
        "prod/tensorflow/A/7/model.tar.gz",
        build_tar_gz_bytes(&[("saved_model.pb", b"binary")]),
    );

    let state = PullerState::new(test_config(root.path()), blob_store);
    let outcome = run_pass(&state).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.processed, 1);
    assert!(root.path().join("local/tensorflow/A/7/saved_model.pb").exists());
}

#[tokio::test]
async fn supersession_adds_the_new_version_without_deleting_the_old_one() {
    let root = tempfile::tempdir().unwrap();
    tokio::fs::create_dir_all(root.path().join("scratch")).await.unwrap();
    tokio::fs::create_dir_all(root.path().join("local/tensorflow/A/7")).await.unwrap();

    let blob_store = Arc::new(FakeBlobStore::new());
    blob_store.put(
        "prod/tensorflow/A/8/model.tar.gz",
        build_tar_gz_bytes(&[("saved_model.pb", b"v8")]),
    );

    let state = PullerState::new(test_config(root.path()), blob_store);
    let outcome = run_pass(&state).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.processed, 1);
    assert!(root.path().join("local/tensorflow/A/7").exists());
    assert!(root.path().join("local/tensorflow/A/8/saved_model.pb").exists());
}

#[tokio::test]
async fn already_current_local_is_not_pulled_again() {
    let root = tempfile::tempdir().unwrap();
    tokio::fs::create_dir_all(root.path().join("scratch")).await.unwrap();
    tokio::fs::create_dir_all(root.path().join("local/tensorflow/A/7")).await.unwrap();

    let blob_store = Arc::new(FakeBlobStore::new());
    blob_store.put(
        "prod/tensorflow/A/7/model.tar.gz",
        build_tar_gz_bytes(&[("saved_model.pb", b"v7")]),
    );

    let state = PullerState::new(test_config(root.path()), blob_store);
    let outcome = run_pass(&state).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.processed, 0);
}

#[tokio::test]
async fn unsafe_tar_member_is_rejected_but_publish_still_succeeds() {
    let root = tempfile::tempdir().unwrap();
    tokio::fs::create_dir_all(root.path().join("scratch")).await.unwrap();

    let blob_store = Arc::new(FakeBlobStore::new());
    blob_store.put(
        "prod/tensorflow/A/1/model.tar.gz",
        build_tar_gz_bytes(&[
            ("../../escape.txt", b"malicious"),
            ("saved_model.pb", b"ok"),
        ]),
    );

    let state = PullerState::new(test_config(root.path()), blob_store);
    let outcome = run_pass(&state).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.processed, 1);
    assert!(root.path().join("local/tensorflow/A/1/saved_model.pb").exists());
    assert!(!root.path().join("escape.txt").exists());
}

#[tokio::test]
async fn priority_remote_is_pulled_even_when_local_has_a_higher_ordinary_version() {
    let root = tempfile::tempdir().unwrap();
    tokio::fs::create_dir_all(root.path().join("scratch")).await.unwrap();
    tokio::fs::create_dir_all(root.path().join("local/tensorflow/B/3")).await.unwrap();

    let blob_store = Arc::new(FakeBlobStore::new());
    blob_store.put(
        "prod/tensorflow/B/0/model.tar.gz",
        build_tar_gz_bytes(&[("saved_model.pb", b"priority-pin")]),
    );

    let state = PullerState::new(test_config(root.path()), blob_store);
    let outcome = run_pass(&state).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.processed, 1);
    assert!(root.path().join("local/tensorflow/B/0/saved_model.pb").exists());
}
