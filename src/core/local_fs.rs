// src/core/local_fs.rs

//! Scans the local model root for extracted version directories and
//! performs the atomic-publish idiom used by the puller's fetch path.

use crate::core::errors::CoreResult;
use crate::core::record::{LocalRecord, Record, RecordKey};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

/// Walks `<local_root>/<framework>/<name>/<version>/` and returns every
/// directory found, grouped by key. A directory name that does not parse as
/// a `u64` version is skipped with a warning rather than treated as an
/// error.
pub async fn scan_local_records(
    local_root: &Path,
) -> CoreResult<HashMap<RecordKey, Vec<LocalRecord>>> {
    let mut out: HashMap<RecordKey, Vec<LocalRecord>> = HashMap::new();
    let mut framework_dirs = match tokio::fs::read_dir(local_root).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
        Err(e) => return Err(e.into()),
    };

    while let Some(framework_entry) = framework_dirs.next_entry().await? {
        if !framework_entry.file_type().await?.is_dir() {
            continue;
        }
        let framework = framework_entry.file_name().to_string_lossy().to_string();
        let mut name_dirs = tokio::fs::read_dir(framework_entry.path()).await?;
        while let Some(name_entry) = name_dirs.next_entry().await? {
            if !name_entry.file_type().await?.is_dir() {
                continue;
            }
            let name = name_entry.file_name().to_string_lossy().to_string();
            let key = RecordKey::new(framework.clone(), name.clone());
            let mut version_dirs = tokio::fs::read_dir(name_entry.path()).await?;
            while let Some(version_entry) = version_dirs.next_entry().await? {
                if !version_entry.file_type().await?.is_dir() {
                    continue;
                }
                let version_str = version_entry.file_name().to_string_lossy().to_string();
                let Ok(version) = version_str.parse::<u64>() else {
                    warn!(path = %version_entry.path().display(), "skipping non-numeric version directory");
                    continue;
                };
                out.entry(key.clone()).or_default().push(LocalRecord {
                    record: Record::new(key.clone(), version),
                    local_path: version_entry.path(),
                });
            }
        }
    }
    Ok(out)
}

pub fn final_path(local_root: &Path, key: &RecordKey, version: u64) -> PathBuf {
    local_root.join(&key.framework).join(&key.name).join(version.to_string())
}

/// Removes a local version directory recursively, best-effort: a missing
/// directory is not an error.
pub async fn remove_local_dir(path: &Path) -> CoreResult<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => {
            info!(path = %path.display(), "removed local model directory");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Publishes `from` (a fully-populated scratch directory) to `final_path`
/// with a single rename. If `final_path` already exists, the rename is
/// abandoned and the existing copy is left untouched (another racer won).
pub async fn publish_atomic(from: &Path, final_path: &Path) -> CoreResult<()> {
    if tokio::fs::try_exists(final_path).await? {
        warn!(path = %final_path.display(), "publish race detected, leaving existing directory untouched");
        return Ok(());
    }
    if let Some(parent) = final_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    match tokio::fs::rename(from, final_path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            warn!(path = %final_path.display(), "publish race detected on rename, leaving existing directory untouched");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Allocates a fresh scratch directory under `scratch_root` for one fetch
/// attempt.
pub async fn new_scratch_dir(scratch_root: &Path) -> CoreResult<PathBuf> {
    let dir = scratch_root.join(Uuid::new_v4().to_string());
    tokio::fs::create_dir_all(&dir).await?;
    Ok(dir)
}
