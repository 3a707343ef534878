// src/synchronizer/state.rs

//! Shared process state for the serving-config synchronizer.

use crate::config::SynchronizerConfig;
use crate::core::engine_client::EngineClient;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PassInfo {
    pub ran_at: DateTime<Utc>,
    pub duration: Duration,
    pub succeeded: bool,
}

pub struct SynchronizerState {
    pub config: SynchronizerConfig,
    pub http_client: reqwest::Client,
    pub engine_client: Arc<dyn EngineClient>,
    /// Serializes the background loop and any operator-triggered pass so
    /// that two passes never run concurrently.
    pub pass_lock: tokio::sync::Mutex<()>,
    pub last_config_update: Mutex<Option<PassInfo>>,
    pub last_local_remove: Mutex<Option<PassInfo>>,
    pub started_at: DateTime<Utc>,
}

impl SynchronizerState {
    pub fn new(config: SynchronizerConfig, engine_client: Arc<dyn EngineClient>) -> Arc<Self> {
        Arc::new(SynchronizerState {
            config,
            http_client: reqwest::Client::new(),
            engine_client,
            pass_lock: tokio::sync::Mutex::new(()),
            last_config_update: Mutex::new(None),
            last_local_remove: Mutex::new(None),
            started_at: Utc::now(),
        })
    }

    pub fn is_stale(&self) -> bool {
        let threshold = self.config.config_update_frequency * 4;
        let stale_against = |info: &Option<PassInfo>| match info {
            Some(info) => {
                let age = Utc::now().signed_duration_since(info.ran_at);
                age.to_std().unwrap_or(Duration::MAX) > threshold
            }
            None => {
                Utc::now().signed_duration_since(self.started_at).num_seconds()
                    > threshold.as_secs() as i64
            }
        };
        stale_against(&self.last_config_update.lock()) || stale_against(&self.last_local_remove.lock())
    }
}
