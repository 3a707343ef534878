// src/puller/fetch.rs

//! The atomic fetch: download, sandboxed extraction, and rename-into-place.

use crate::core::archive::extract_sandboxed;
use crate::core::blobstore::BlobDescriptor;
use crate::core::errors::{CoreError, CoreResult};
use crate::core::local_fs::{final_path, new_scratch_dir, publish_atomic};
use crate::core::record::RecordKey;
use crate::puller::state::PullerState;
use std::path::Path;
use tracing::info;

/// Downloads `descriptor` into a fresh scratch directory, extracts it
/// under a sandbox, and publishes the result to
/// `<local_root>/<framework>/<name>/<version>/` with a single rename. The
/// scratch directory is removed on every exit path.
pub async fn atomic_fetch(
    state: &PullerState,
    key: &RecordKey,
    version: u64,
    descriptor: &BlobDescriptor,
) -> CoreResult<()> {
    let scratch_root = &state.config.temporary_model_download_directory;
    let scratch_dir = new_scratch_dir(scratch_root).await?;
    let result = atomic_fetch_inner(state, key, version, descriptor, &scratch_dir).await;
    let _ = tokio::fs::remove_dir_all(&scratch_dir).await;
    result
}

async fn atomic_fetch_inner(
    state: &PullerState,
    key: &RecordKey,
    version: u64,
    descriptor: &BlobDescriptor,
    scratch_dir: &Path,
) -> CoreResult<()> {
    let archive_path = scratch_dir.join("model.tar.gz");
    state.blob_store.download(descriptor, &archive_path).await?;

    if !tokio::fs::try_exists(&archive_path).await? {
        return Err(CoreError::DownloadFailed {
            remote: descriptor.name.clone(),
        });
    }

    let untared_dir = scratch_dir.join("untared_model");
    tokio::fs::create_dir_all(&untared_dir).await?;
    let archive_path_owned = archive_path.clone();
    let untared_dir_owned = untared_dir.clone();
    tokio::task::spawn_blocking(move || extract_sandboxed(&archive_path_owned, &untared_dir_owned))
        .await
        .map_err(|e| CoreError::Other(e.into()))??;

    let destination = final_path(&state.config.local_model_directory, key, version);
    publish_atomic(&untared_dir, &destination).await?;
    info!(key = ?key, version, "published local model directory");
    Ok(())
}
