// src/core/metrics.rs

//! Defines and registers Prometheus metrics for reconciliation monitoring.
//!
//! This module uses `lazy_static` to ensure that metrics are registered only once
//! globally for the entire application lifecycle.

use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, Histogram, TextEncoder, register_counter, register_counter_vec,
    register_gauge, register_histogram,
};

lazy_static! {
    // --- Reconciliation pass gauges ---
    /// Unix timestamp of the last completed reconciliation pass.
    pub static ref LAST_PASS_TIMESTAMP: Gauge =
        register_gauge!("fleetmodeld_last_pass_timestamp_seconds", "Unix timestamp of the last completed reconciliation pass.").unwrap();
    /// Duration in seconds of the most recent reconciliation pass.
    pub static ref LAST_PASS_DURATION_SECONDS: Gauge =
        register_gauge!("fleetmodeld_last_pass_duration_seconds", "Duration in seconds of the most recent reconciliation pass.").unwrap();
    /// Number of local records currently tracked, across all keys.
    pub static ref LOCAL_RECORDS_TOTAL: Gauge =
        register_gauge!("fleetmodeld_local_records_total", "Number of local model version directories currently on disk.").unwrap();
    /// Number of registered nodes of each type, observed at the coordinator.
    pub static ref REGISTERED_NODES: CounterVec =
        register_counter_vec!("fleetmodeld_registered_nodes_total", "Cumulative node registrations received, labeled by node_type.", &["node_type"]).unwrap();

    // --- Puller counters ---
    /// The total number of artifacts successfully fetched and published.
    pub static ref ARTIFACTS_PULLED_TOTAL: Counter =
        register_counter!("fleetmodeld_artifacts_pulled_total", "Total number of remote artifacts fetched and published locally.").unwrap();
    /// The total number of downloads that produced no local file.
    pub static ref DOWNLOAD_FAILURES_TOTAL: Counter =
        register_counter!("fleetmodeld_download_failures_total", "Total number of downloads that failed to produce a local file.").unwrap();
    /// The total number of tar members rejected by the extraction sandbox.
    pub static ref EXTRACTION_REJECTIONS_TOTAL: Counter =
        register_counter!("fleetmodeld_extraction_rejections_total", "Total number of tar members rejected for unsafe paths.").unwrap();
    /// Keys observed with a local priority pin whose remote counterpart has drifted away from priority.
    pub static ref PRIORITY_DRIFT_TOTAL: Counter =
        register_counter!("fleetmodeld_priority_drift_total", "Total number of priority-drift warnings emitted during a puller pass.").unwrap();

    // --- Synchronizer counters ---
    /// The total number of config entries added across all passes.
    pub static ref CONFIG_ENTRIES_ADDED_TOTAL: Counter =
        register_counter!("fleetmodeld_config_entries_added_total", "Total number of serving config entries added.").unwrap();
    /// The total number of CRC32 conflicts observed on config write.
    pub static ref CONFIG_CONFLICTS_TOTAL: Counter =
        register_counter!("fleetmodeld_config_conflicts_total", "Total number of config writes aborted due to a CRC32 mismatch.").unwrap();
    /// The total number of local directories removed as out-of-date.
    pub static ref LOCAL_REMOVALS_TOTAL: Counter =
        register_counter!("fleetmodeld_local_removals_total", "Total number of local model directories removed as out of date.").unwrap();
    /// The total number of engine status RPCs that failed (other than NOT_FOUND).
    pub static ref ENGINE_RPC_FAILURES_TOTAL: Counter =
        register_counter!("fleetmodeld_engine_rpc_failures_total", "Total number of GetModelStatus RPCs that failed.").unwrap();

    // --- Coordinator counters ---
    /// The total number of registry entries evicted due to fan-out timeout.
    pub static ref REGISTRY_EVICTIONS_TOTAL: Counter =
        register_counter!("fleetmodeld_registry_evictions_total", "Total number of node registrations evicted after a fan-out timeout.").unwrap();

    // --- Histograms ---
    /// A histogram of reconciliation pass durations.
    pub static ref PASS_DURATION_SECONDS: Histogram =
        register_histogram!("fleetmodeld_pass_duration_seconds", "Distribution of reconciliation pass durations in seconds.").unwrap();
}

/// Gathers all registered metrics and encodes them in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder.encode_to_string(&metric_families).unwrap()
}
