// src/puller/reconcile.rs

//! The puller's reconciliation pass: compare remote and local record
//! sets, pull what's missing, and report priority drift.

use crate::core::local_fs::{final_path, scan_local_records};
use crate::core::metrics::{ARTIFACTS_PULLED_TOTAL, PRIORITY_DRIFT_TOTAL};
use crate::core::pass::PassOutcome;
use crate::core::record::{
    Record, RecordKey, RemoteRecord, current_local_set, current_remote_set, need_pull,
};
use crate::puller::fetch::atomic_fetch;
use crate::puller::state::{LastPullInfo, PullerState};
use chrono::Utc;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};

/// Runs one full reconciliation pass: enumerate, compute the pull set,
/// fetch each missing remote, then check for priority drift. Returns a
/// [`PassOutcome`] summarizing what happened.
pub async fn run_pass(state: &PullerState) -> PassOutcome {
    let _guard = state.pass_lock.lock().await;
    let started = Instant::now();
    let mut outcome = PassOutcome::new();
    let mut fetched = Vec::new();

    async {
        let locals_by_key = match scan_local_records(&state.config.local_model_directory).await {
            Ok(map) => map,
            Err(e) => {
                outcome.record_error(e);
                return;
            }
        };
        let locals_current = current_local_set(&locals_by_key);

        let remotes_by_key = match list_remote_records(state).await {
            Ok(map) => map,
            Err(e) => {
                outcome.record_error(e);
                return;
            }
        };
        let remotes_current = current_remote_set(&remotes_by_key);

        for (key, remote) in &remotes_current {
            let locals_for_key = locals_current.get(key).map(|v| v.as_slice());
            if !need_pull(remote, locals_for_key) {
                continue;
            }

            let version = remote.record.version;
            let target = final_path(&state.config.local_model_directory, key, version);
            if tokio::fs::try_exists(&target).await.unwrap_or(false) {
                info!(key = ?key, version, "target already exists, skipping (race-safe)");
                continue;
            }

            let descriptor = match remote_descriptor(state, remote) {
                Ok(d) => d,
                Err(e) => {
                    outcome.record_error(e);
                    continue;
                }
            };

            match atomic_fetch(state, key, version, &descriptor).await {
                Ok(()) => {
                    outcome.processed += 1;
                    ARTIFACTS_PULLED_TOTAL.inc();
                    fetched.push(key.clone());
                }
                Err(crate::core::errors::CoreError::DownloadFailed { remote }) => {
                    crate::core::metrics::DOWNLOAD_FAILURES_TOTAL.inc();
                    outcome.record_warning(format!("download failed for {remote}"));
                }
                Err(e) => {
                    outcome.record_error(e);
                }
            }
        }

        // Priority drift: local is pinned to priority but the remote no
        // longer is. Reporting-only, never mutates anything.
        for (key, local_records) in &locals_current {
            let Some(current_local) = local_records.first() else {
                continue;
            };
            if !current_local.record.is_priority {
                continue;
            }
            if let Some(remote) = remotes_current.get(key) {
                if !remote.record.is_priority {
                    PRIORITY_DRIFT_TOTAL.inc();
                    warn!(key = ?key, "local priority pin has drifted from remote");
                    outcome.record_warning(format!("priority drift detected for {key:?}"));
                }
            }
        }
    }
    .instrument(info_span!("puller_pass"))
    .await;

    *state.last_pull_info.lock() = Some(LastPullInfo {
        ran_at: Utc::now(),
        duration: started.elapsed(),
        fetched,
        succeeded: outcome.is_success(),
    });
    crate::core::metrics::LAST_PASS_TIMESTAMP.set(Utc::now().timestamp() as f64);
    crate::core::metrics::LAST_PASS_DURATION_SECONDS.set(started.elapsed().as_secs_f64());

    outcome
}

async fn list_remote_records(
    state: &PullerState,
) -> crate::core::errors::CoreResult<HashMap<RecordKey, Vec<RemoteRecord>>> {
    let descriptors = state
        .blob_store
        .list(&state.config.remote_model_directory)
        .await?;
    let mut out: HashMap<RecordKey, Vec<RemoteRecord>> = HashMap::new();
    for descriptor in descriptors {
        let Some([_env, framework, name, version_str, filename]) = descriptor.path_components()
        else {
            warn!(blob = %descriptor.name, "discarding blob with fewer than 5 path components");
            continue;
        };
        if filename != "model.tar.gz" {
            continue;
        }
        let Ok(version) = version_str.parse::<u64>() else {
            warn!(blob = %descriptor.name, "discarding blob with non-numeric version segment");
            continue;
        };
        let key = RecordKey::new(framework, name);
        out.entry(key.clone()).or_default().push(RemoteRecord {
            record: Record::new(key, version),
            remote_path: descriptor.name.clone(),
        });
    }
    Ok(out)
}

fn remote_descriptor(
    state: &PullerState,
    remote: &RemoteRecord,
) -> crate::core::errors::CoreResult<crate::core::blobstore::BlobDescriptor> {
    Ok(crate::core::blobstore::BlobDescriptor {
        bucket: state.config.gcs_bucket.clone(),
        name: remote.remote_path.clone(),
    })
}
