use super::test_helpers::FakeEngineClient;
use fleetmodeld::config::{Environment, SynchronizerConfig};
use fleetmodeld::core::record::{Record, RecordKey, ServingRecord, ServingStatus};
use fleetmodeld::core::serving_config::{read_config, serialize, write_config_guarded, ConfigEntry, ModelVersionPolicy};
use fleetmodeld::synchronizer::priority::remove_priority;
use fleetmodeld::synchronizer::reconcile::{config_reconcile_pass, removal_pass};
use fleetmodeld::synchronizer::state::SynchronizerState;
use std::sync::Arc;
use std::time::Duration;

fn test_config(root: &std::path::Path) -> SynchronizerConfig {
    SynchronizerConfig {
        environment: Environment::Test,
        http_host: "127.0.0.1".to_string(),
        http_port: 0,
        http_workers: 1,
        master_url: "http://127.0.0.1:0".to_string(),
        local_model_directory: root.join("local"),
        tensorflow_serving_config_file: root.join("model_config.pbtxt"),
        tensorflow_serving_grpc_target: "http://127.0.0.1:0".to_string(),
        config_update_frequency: Duration::from_secs(30),
    }
}

#[tokio::test]
async fn empty_to_one_remote_adds_a_latest_one_entry() {
    let root = tempfile::tempdir().unwrap();
    tokio::fs::create_dir_all(root.path().join("local/tensorflow/A/7")).await.unwrap();

    let engine = Arc::new(FakeEngineClient::new());
    let state = SynchronizerState::new(test_config(root.path()), engine);

    let outcome = config_reconcile_pass(&state).await;
    assert!(outcome.is_success());
    assert_eq!(outcome.processed, 1);

    let (entries, _) = read_config(&state.config.tensorflow_serving_config_file).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "A");
    assert_eq!(entries[0].model_version_policy, ModelVersionPolicy::Latest { num_versions: 1 });
}

#[tokio::test]
async fn supersession_removal_pass_deletes_only_the_out_of_date_version() {
    let root = tempfile::tempdir().unwrap();
    tokio::fs::create_dir_all(root.path().join("local/tensorflow/A/7")).await.unwrap();
    tokio::fs::create_dir_all(root.path().join("local/tensorflow/A/8")).await.unwrap();

    let config_path = root.path().join("model_config.pbtxt");
    let entries = vec![ConfigEntry::latest_one("A", root.path().join("local/tensorflow/A/8").to_string_lossy())];
    tokio::fs::write(&config_path, serialize(&entries)).await.unwrap();

    let engine = Arc::new(FakeEngineClient::new());
    engine.set_status(
        RecordKey::new("tensorflow", "A"),
        vec![ServingRecord {
            record: Record::new(RecordKey::new("tensorflow", "A"), 8),
            status: ServingStatus::Available,
        }],
    );

    let state = SynchronizerState::new(test_config(root.path()), engine);
    let outcome = removal_pass(&state).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.processed, 1);
    assert!(!root.path().join("local/tensorflow/A/7").exists());
    assert!(root.path().join("local/tensorflow/A/8").exists());
}

#[tokio::test]
async fn removal_pass_never_deletes_a_key_absent_from_the_engine_view() {
    let root = tempfile::tempdir().unwrap();
    tokio::fs::create_dir_all(root.path().join("local/tensorflow/A/7")).await.unwrap();

    // No config entries at all, so the engine is never even queried about A:
    // a key absent from engine_view must never be treated as out of date.
    let engine = Arc::new(FakeEngineClient::new());
    let state = SynchronizerState::new(test_config(root.path()), engine);
    let outcome = removal_pass(&state).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.processed, 0);
    assert!(root.path().join("local/tensorflow/A/7").exists());
}

#[tokio::test]
async fn priority_release_drops_the_pin_and_restores_ordinary_latest() {
    let root = tempfile::tempdir().unwrap();
    let key = RecordKey::new("tensorflow", "B");
    tokio::fs::create_dir_all(root.path().join("local/tensorflow/B/0")).await.unwrap();
    tokio::fs::create_dir_all(root.path().join("local/tensorflow/B/3")).await.unwrap();

    let config_path = root.path().join("model_config.pbtxt");
    let entries = vec![ConfigEntry::priority("B", root.path().join("local/tensorflow/B/0").to_string_lossy())];
    tokio::fs::write(&config_path, serialize(&entries)).await.unwrap();

    let engine = Arc::new(FakeEngineClient::new());
    engine.set_status(
        key.clone(),
        vec![ServingRecord {
            record: Record::new(key.clone(), 0),
            status: ServingStatus::Available,
        }],
    );

    let state = SynchronizerState::new(test_config(root.path()), engine);
    let outcome = remove_priority(&state, &key).await;

    assert!(outcome.is_success());
    assert!(!root.path().join("local/tensorflow/B/0").exists());

    let (entries, _) = read_config(&state.config.tensorflow_serving_config_file).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "B");
    assert_eq!(entries[0].model_version_policy, ModelVersionPolicy::Latest { num_versions: 1 });
}

#[tokio::test]
async fn config_conflict_leaves_the_file_as_the_winners_output() {
    let root = tempfile::tempdir().unwrap();
    let config_path = root.path().join("model_config.pbtxt");

    // Two synchronizers both observe the same (empty) starting CRC.
    let (_, observed_crc) = read_config(&config_path).await.unwrap();

    let winner = vec![ConfigEntry::latest_one("winner", "/models/tensorflow/winner")];
    write_config_guarded(&config_path, observed_crc, &winner).await.unwrap();

    let loser = vec![ConfigEntry::latest_one("loser", "/models/tensorflow/loser")];
    let err = write_config_guarded(&config_path, observed_crc, &loser).await.unwrap_err();
    assert!(matches!(err, fleetmodeld::core::errors::CoreError::ConfigConflict));

    let (on_disk, _) = read_config(&config_path).await.unwrap();
    assert_eq!(on_disk, winner);
}
