// src/core/engine_client.rs

//! Client for the serving engine's `GetModelStatus` RPC.
//!
//! A NOT_FOUND response means "no versions reported" and is treated as an
//! empty map, not an error. Any other RPC failure is logged and also
//! collapses to an empty map: the synchronizer treats "the engine hasn't
//! caught up yet" and "the engine errored" identically, since neither ever
//! licenses deleting local data.

use crate::core::metrics::ENGINE_RPC_FAILURES_TOTAL;
use crate::core::record::{EngineView, Record, RecordKey, ServingRecord, ServingStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tonic::transport::Channel;
use tonic::Code;
use tracing::warn;

pub mod pb {
    tonic::include_proto!("fleetmodeld.serving");
}

use pb::model_service_client::ModelServiceClient;
use pb::{GetModelStatusRequest, ModelSpec, model_version_status::State};

const STATUS_RPC_DEADLINE: Duration = Duration::from_millis(500);

#[async_trait]
pub trait EngineClient: Send + Sync {
    /// Fetches the engine's view of every version it knows about for
    /// `key`. Never returns an error to the caller: RPC failures collapse
    /// to an empty `Vec`.
    async fn get_model_status(&self, key: &RecordKey) -> Vec<ServingRecord>;
}

pub struct GrpcEngineClient {
    client: ModelServiceClient<Channel>,
}

impl GrpcEngineClient {
    pub async fn connect(target: &str) -> Result<Self, tonic::transport::Error> {
        let channel = Channel::from_shared(target.to_string())
            .expect("invalid gRPC target URI")
            .connect()
            .await?;
        Ok(GrpcEngineClient {
            client: ModelServiceClient::new(channel),
        })
    }
}

fn state_to_status(state: i32) -> ServingStatus {
    match State::try_from(state).unwrap_or(State::Unknown) {
        State::Unknown => ServingStatus::Unknown,
        State::Start => ServingStatus::Start,
        State::Loading => ServingStatus::Loading,
        State::Available => ServingStatus::Available,
        State::Unloading => ServingStatus::Unloading,
        State::End => ServingStatus::End,
    }
}

#[async_trait]
impl EngineClient for GrpcEngineClient {
    async fn get_model_status(&self, key: &RecordKey) -> Vec<ServingRecord> {
        let mut client = self.client.clone();
        let mut request = tonic::Request::new(GetModelStatusRequest {
            model_spec: Some(ModelSpec {
                name: key.name.clone(),
                signature_name: String::new(),
                version_choice: None,
            }),
        });
        request.set_timeout(STATUS_RPC_DEADLINE);

        match client.get_model_status(request).await {
            Ok(response) => response
                .into_inner()
                .model_version_status
                .into_iter()
                .map(|status| ServingRecord {
                    record: Record::new(key.clone(), status.version as u64),
                    status: state_to_status(status.state),
                })
                .collect(),
            Err(status) if status.code() == Code::NotFound => Vec::new(),
            Err(status) => {
                ENGINE_RPC_FAILURES_TOTAL.inc();
                warn!(key = ?key, error = %status, "engine status RPC failed, treating as no data");
                Vec::new()
            }
        }
    }
}

/// Builds an [`EngineView`] by querying every key in `keys` individually.
pub async fn build_engine_view(
    client: &dyn EngineClient,
    keys: impl IntoIterator<Item = RecordKey>,
) -> EngineView {
    let mut view = HashMap::new();
    for key in keys {
        let records = client.get_model_status(&key).await;
        view.insert(key, records);
    }
    view
}
