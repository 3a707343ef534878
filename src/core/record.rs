// src/core/record.rs

//! Record identity, versioning, and the pure tie-break functions every
//! reconciliation loop is built from.
//!
//! These types deliberately do not derive `Ord`/`PartialOrd`: the tie-break
//! rule (priority beats any positive version, otherwise higher version
//! wins, ties keep the first-seen argument) is significant enough that it
//! must be spelled out in one place rather than risk a stray `.sort()`
//! reimplementing it differently.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// The sentinel version identifying the priority overlay slot.
pub const PRIORITY_VERSION: u64 = 0;

/// Unique identity of a model across all of its versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub framework: String,
    pub name: String,
}

impl RecordKey {
    pub fn new(framework: impl Into<String>, name: impl Into<String>) -> Self {
        RecordKey {
            framework: framework.into(),
            name: name.into(),
        }
    }
}

/// A non-negative version number. `0` means "priority slot"; any positive
/// integer is an ordinary version.
pub type Version = u64;

pub fn is_priority(version: Version) -> bool {
    version == PRIORITY_VERSION
}

/// A bare (key, version) pair plus its priority bit, with no backing
/// storage. `RemoteRecord` and `LocalRecord` wrap this with a location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    pub key: RecordKey,
    pub version: Version,
    pub is_priority: bool,
}

impl Record {
    pub fn new(key: RecordKey, version: Version) -> Self {
        Record {
            key,
            version,
            is_priority: is_priority(version),
        }
    }
}

/// A record backed by a blob in the remote object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub record: Record,
    /// Opaque locator of the blob, e.g. `<env>/<framework>/<name>/<version>/model.tar.gz`.
    pub remote_path: String,
}

/// A record backed by an extracted directory on local disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalRecord {
    pub record: Record,
    pub local_path: PathBuf,
}

/// The lifecycle states the serving engine reports for a model version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServingStatus {
    Unknown,
    Start,
    Loading,
    Available,
    Unloading,
    End,
}

/// A record as observed from the serving engine's status RPC. Never
/// persisted — valid only for the duration of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServingRecord {
    pub record: Record,
    pub status: ServingStatus,
}

/// Snapshot of the serving engine's per-key version/status set, valid only
/// for the duration of one pass.
pub type EngineView = HashMap<RecordKey, Vec<ServingRecord>>;

/// For two RemoteRecords sharing a key, return the one to keep: if either
/// is priority, return that one (`a` wins if both are priority); else
/// return the one with the greater version.
pub fn choose_current_remote<'a>(a: &'a RemoteRecord, b: &'a RemoteRecord) -> &'a RemoteRecord {
    debug_assert_eq!(a.record.key, b.record.key);
    if a.record.is_priority {
        return a;
    }
    if b.record.is_priority {
        return b;
    }
    if a.record.version >= b.record.version { a } else { b }
}

fn sort_key(r: &Record) -> (bool, Version) {
    (r.is_priority, r.version)
}

/// Reduce a map of key -> all known remote records to key -> the single
/// current remote (by `choose_current_remote`, folded left to right so that
/// the first-seen argument wins priority ties).
pub fn current_remote_set(
    records_by_key: &HashMap<RecordKey, Vec<RemoteRecord>>,
) -> HashMap<RecordKey, RemoteRecord> {
    let mut out = HashMap::with_capacity(records_by_key.len());
    for (key, records) in records_by_key {
        let mut iter = records.iter();
        let Some(first) = iter.next() else { continue };
        let mut current = first;
        for candidate in iter {
            current = choose_current_remote(current, candidate);
        }
        out.insert(key.clone(), current.clone());
    }
    out
}

/// For each key, sort its records descending by (is_priority, version); the
/// head is "current", the tail is "out of date". Returns the full sorted
/// list per key so callers can inspect both.
pub fn current_local_set(
    records_by_key: &HashMap<RecordKey, Vec<LocalRecord>>,
) -> HashMap<RecordKey, Vec<LocalRecord>> {
    let mut out = HashMap::with_capacity(records_by_key.len());
    for (key, records) in records_by_key {
        let mut sorted = records.clone();
        sorted.sort_by(|a, b| sort_key(&b.record).cmp(&sort_key(&a.record)));
        out.insert(key.clone(), sorted);
    }
    out
}

/// True iff the key is absent from locals, the locals' current version is
/// strictly less than the remote's current version, or the remote is
/// priority and the locals' current is not.
pub fn need_pull(remote: &RemoteRecord, locals_for_key: Option<&[LocalRecord]>) -> bool {
    let Some(sorted_locals) = locals_for_key else {
        return true;
    };
    let Some(current_local) = sorted_locals.first() else {
        return true;
    };
    if current_local.record.version < remote.record.version {
        return true;
    }
    if remote.record.is_priority && !current_local.record.is_priority {
        return true;
    }
    false
}

/// True iff the key is absent from the config, or the engine's most recent
/// AVAILABLE serving record for that key has a different `is_priority` than
/// the local record we would serve.
pub fn need_add_to_config(
    key: &RecordKey,
    record: &Record,
    config_keys: &std::collections::HashSet<String>,
    engine_view: &EngineView,
) -> bool {
    if !config_keys.contains(&key.name) {
        return true;
    }
    let most_recent_available = engine_view
        .get(key)
        .into_iter()
        .flatten()
        .filter(|sr| sr.status == ServingStatus::Available)
        .max_by_key(|sr| sr.record.version);
    match most_recent_available {
        Some(sr) => sr.record.is_priority != record.is_priority,
        None => false,
    }
}

/// A local version is out of date iff the engine has at least one AVAILABLE
/// version for that key and `local.version < max(AVAILABLE versions)`. A
/// key absent from `engine_view` is never out of date — the engine hasn't
/// caught up yet. Pure function; never consults files.
pub fn out_of_date_local(local: &LocalRecord, engine_view: &EngineView) -> bool {
    let Some(serving_records) = engine_view.get(&local.record.key) else {
        return false;
    };
    let max_available = serving_records
        .iter()
        .filter(|sr| sr.status == ServingStatus::Available)
        .map(|sr| sr.record.version)
        .max();
    match max_available {
        Some(max_version) => local.record.version < max_version,
        None => false,
    }
}
