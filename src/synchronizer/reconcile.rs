// src/synchronizer/reconcile.rs

//! The synchronizer's two reconciliation passes: adding newly-available
//! local models to the serving config, and removing local directories the
//! engine no longer considers current.

use crate::core::engine_client::build_engine_view;
use crate::core::errors::CoreError;
use crate::core::local_fs::{remove_local_dir, scan_local_records};
use crate::core::metrics::{CONFIG_CONFLICTS_TOTAL, CONFIG_ENTRIES_ADDED_TOTAL, LOCAL_REMOVALS_TOTAL};
use crate::core::pass::PassOutcome;
use crate::core::record::{current_local_set, need_add_to_config, out_of_date_local, EngineView, RecordKey};
use crate::core::serving_config::{read_config, write_config_guarded, ConfigEntry};
use crate::synchronizer::state::SynchronizerState;
use std::collections::HashSet;
use tracing::{info, info_span, warn, Instrument};

const TENSORFLOW_FRAMEWORK: &str = "tensorflow";

/// One config-reconcile pass: adds config entries for local records that
/// satisfy `need_add_to_config`, writing the config under a CRC32 guard.
pub async fn config_reconcile_pass(state: &SynchronizerState) -> PassOutcome {
    let _guard = state.pass_lock.lock().await;
    let mut outcome = PassOutcome::new();

    async {
        let (mut entries, observed_crc) = match read_config(&state.config.tensorflow_serving_config_file).await {
            Ok(v) => v,
            Err(e) => {
                outcome.record_error(e);
                return;
            }
        };

        let locals_by_key = match scan_local_records(&state.config.local_model_directory).await {
            Ok(map) => map,
            Err(e) => {
                outcome.record_error(e);
                return;
            }
        };
        let locals_by_key: std::collections::HashMap<_, _> = locals_by_key
            .into_iter()
            .filter(|(key, _)| key.framework == TENSORFLOW_FRAMEWORK)
            .collect();
        let locals_current = current_local_set(&locals_by_key);

        let config_keys: HashSet<String> = entries.iter().map(|e| e.name.clone()).collect();
        let query_keys: Vec<RecordKey> = entries
            .iter()
            .map(|e: &ConfigEntry| RecordKey::new(TENSORFLOW_FRAMEWORK, e.name.clone()))
            .collect();
        let engine_view: EngineView = build_engine_view(state.engine_client.as_ref(), query_keys).await;

        for (key, versions) in &locals_current {
            let Some(current) = versions.first() else { continue };
            if !need_add_to_config(key, &current.record, &config_keys, &engine_view) {
                continue;
            }

            entries.retain(|e| e.name != key.name);
            let base_path = current.local_path.to_string_lossy().to_string();
            let entry = if current.record.is_priority {
                ConfigEntry::priority(key.name.clone(), base_path)
            } else {
                ConfigEntry::latest_one(key.name.clone(), base_path)
            };
            entries.push(entry);
            outcome.processed += 1;
            CONFIG_ENTRIES_ADDED_TOTAL.inc();
            info!(key = ?key, "adding serving config entry");
        }

        if outcome.processed == 0 {
            return;
        }

        match write_config_guarded(&state.config.tensorflow_serving_config_file, observed_crc, &entries).await {
            Ok(()) => {}
            Err(CoreError::ConfigConflict) => {
                CONFIG_CONFLICTS_TOTAL.inc();
                warn!("config write aborted: CRC32 changed since last read");
                outcome.record_error(CoreError::ConfigConflict);
            }
            Err(e) => outcome.record_error(e),
        }
    }
    .instrument(info_span!("synchronizer_config_pass"))
    .await;

    record_config_update(state, outcome.is_success());
    outcome
}

fn record_config_update(state: &SynchronizerState, succeeded: bool) {
    *state.last_config_update.lock() = Some(crate::synchronizer::state::PassInfo {
        ran_at: chrono::Utc::now(),
        duration: std::time::Duration::from_secs(0),
        succeeded,
    });
}

/// One removal pass: deletes local directories the engine no longer
/// considers current. A key absent from the engine's view is never
/// removed — the engine hasn't caught up yet.
pub async fn removal_pass(state: &SynchronizerState) -> PassOutcome {
    let _guard = state.pass_lock.lock().await;
    let mut outcome = PassOutcome::new();

    async {
        let (entries, _crc) = match read_config(&state.config.tensorflow_serving_config_file).await {
            Ok(v) => v,
            Err(e) => {
                outcome.record_error(e);
                return;
            }
        };

        let locals_by_key = match scan_local_records(&state.config.local_model_directory).await {
            Ok(map) => map,
            Err(e) => {
                outcome.record_error(e);
                return;
            }
        };

        let query_keys: Vec<RecordKey> = entries
            .iter()
            .map(|e: &ConfigEntry| RecordKey::new(TENSORFLOW_FRAMEWORK, e.name.clone()))
            .collect();
        let engine_view: EngineView = build_engine_view(state.engine_client.as_ref(), query_keys).await;

        for (_key, versions) in &locals_by_key {
            for local in versions {
                if !out_of_date_local(local, &engine_view) {
                    continue;
                }
                match remove_local_dir(&local.local_path).await {
                    Ok(()) => {
                        outcome.processed += 1;
                        LOCAL_REMOVALS_TOTAL.inc();
                    }
                    Err(e) => outcome.record_error(e),
                }
            }
        }
    }
    .instrument(info_span!("synchronizer_removal_pass"))
    .await;

    *state.last_local_remove.lock() = Some(crate::synchronizer::state::PassInfo {
        ran_at: chrono::Utc::now(),
        duration: std::time::Duration::from_secs(0),
        succeeded: outcome.is_success(),
    });
    outcome
}
