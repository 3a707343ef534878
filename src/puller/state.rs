// src/puller/state.rs

//! Shared process state for the artifact puller: configuration, blob
//! client, and the small persisted cache the health endpoint consults.

use crate::config::PullerConfig;
use crate::core::blobstore::BlobStore;
use crate::core::record::RecordKey;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Snapshot of the most recently completed reconciliation pass, consulted
/// by `GET /health` to detect staleness.
#[derive(Debug, Clone)]
pub struct LastPullInfo {
    pub ran_at: DateTime<Utc>,
    pub duration: Duration,
    pub fetched: Vec<RecordKey>,
    pub succeeded: bool,
}

pub struct PullerState {
    pub config: PullerConfig,
    pub blob_store: Arc<dyn BlobStore>,
    pub http_client: reqwest::Client,
    /// Serializes reconciliation passes: the background timer loop and any
    /// operator-triggered `POST /pull` share this lock so two passes never
    /// run concurrently.
    pub pass_lock: tokio::sync::Mutex<()>,
    pub last_pull_info: Mutex<Option<LastPullInfo>>,
    pub started_at: DateTime<Utc>,
}

impl PullerState {
    pub fn new(config: PullerConfig, blob_store: Arc<dyn BlobStore>) -> Arc<Self> {
        Arc::new(PullerState {
            config,
            blob_store,
            http_client: reqwest::Client::new(),
            pass_lock: tokio::sync::Mutex::new(()),
            last_pull_info: Mutex::new(None),
            started_at: Utc::now(),
        })
    }

    /// True iff no reconciliation pass has completed within
    /// `4 * REMOTE_MODEL_PULL_FREQUENCY`.
    pub fn is_stale(&self) -> bool {
        let threshold = self.config.remote_model_pull_frequency * 4;
        match self.last_pull_info.lock().as_ref() {
            Some(info) => {
                let age = Utc::now().signed_duration_since(info.ran_at);
                age.to_std().unwrap_or(Duration::MAX) > threshold
            }
            None => Utc::now().signed_duration_since(self.started_at).num_seconds()
                > threshold.as_secs() as i64,
        }
    }
}
