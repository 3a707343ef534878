// src/synchronizer/priority.rs

//! The remove-priority operation: atomic from the caller's perspective,
//! best-effort internally — drop the priority config entry and local
//! directory, then re-add the ordinary-latest entry for the key.

use crate::core::engine_client::build_engine_view;
use crate::core::local_fs::{final_path, remove_local_dir, scan_local_records};
use crate::core::pass::PassOutcome;
use crate::core::record::{RecordKey, ServingStatus, PRIORITY_VERSION};
use crate::core::serving_config::{read_config, write_config_guarded, ConfigEntry};
use crate::synchronizer::state::SynchronizerState;
use tracing::info;

pub async fn remove_priority(state: &SynchronizerState, key: &RecordKey) -> PassOutcome {
    let _guard = state.pass_lock.lock().await;
    let mut outcome = PassOutcome::new();

    let (mut entries, observed_crc) = match read_config(&state.config.tensorflow_serving_config_file).await {
        Ok(v) => v,
        Err(e) => {
            outcome.record_error(e);
            return outcome;
        }
    };

    let engine_view = build_engine_view(state.engine_client.as_ref(), [key.clone()]).await;
    let priority_available = engine_view
        .get(key)
        .into_iter()
        .flatten()
        .any(|sr| sr.record.version == PRIORITY_VERSION && sr.status == ServingStatus::Available);

    if priority_available {
        entries.retain(|e| e.name != key.name);
    }

    let priority_dir = final_path(&state.config.local_model_directory, key, PRIORITY_VERSION);
    if let Err(e) = remove_local_dir(&priority_dir).await {
        outcome.record_error(e);
        return outcome;
    }

    let locals_by_key = match scan_local_records(&state.config.local_model_directory).await {
        Ok(map) => map,
        Err(e) => {
            outcome.record_error(e);
            return outcome;
        }
    };
    let ordinary_latest = locals_by_key
        .get(key)
        .into_iter()
        .flatten()
        .filter(|r| !r.record.is_priority)
        .max_by_key(|r| r.record.version);

    if let Some(local) = ordinary_latest {
        entries.retain(|e| e.name != key.name);
        let base_path = local.local_path.to_string_lossy().to_string();
        entries.push(ConfigEntry::latest_one(key.name.clone(), base_path));
        info!(key = ?key, version = local.record.version, "re-added ordinary-latest entry after priority release");
    }

    match write_config_guarded(&state.config.tensorflow_serving_config_file, observed_crc, &entries).await {
        Ok(()) => outcome.processed = 1,
        Err(e) => outcome.record_error(e),
    }
    outcome
}
