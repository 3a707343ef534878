// src/core/blobstore/mod.rs

//! The minimal blob-store contract the puller and coordinator consume.
//! Concrete implementations live alongside this module (see [`gcs`]).

pub mod gcs;

use crate::core::errors::CoreResult;
use async_trait::async_trait;
use std::path::Path;

/// An opaque handle to a single blob, carrying enough of its name to
/// reconstruct the `<env>/<framework>/<name>/<version>/model.tar.gz`
/// convention layered above this contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobDescriptor {
    pub bucket: String,
    pub name: String,
}

impl BlobDescriptor {
    /// Splits `name` on `/` and discards it with a `None` if it has fewer
    /// than 5 components (`<env>/<framework>/<name>/<version>/model.tar.gz`).
    pub fn path_components(&self) -> Option<[&str; 5]> {
        let parts: Vec<&str> = self.name.split('/').collect();
        if parts.len() < 5 {
            return None;
        }
        let n = parts.len();
        Some([
            parts[n - 5],
            parts[n - 4],
            parts[n - 3],
            parts[n - 2],
            parts[n - 1],
        ])
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Lists every blob whose name starts with `prefix`.
    async fn list(&self, prefix: &str) -> CoreResult<Vec<BlobDescriptor>>;

    /// Downloads a single blob to `to_path`. No deadline — bounded only by
    /// object size.
    async fn download(&self, descriptor: &BlobDescriptor, to_path: &Path) -> CoreResult<()>;

    /// Server-side copies `src` to a new blob named `dst_name` in the same
    /// bucket.
    async fn copy(&self, src: &BlobDescriptor, dst_name: &str) -> CoreResult<()>;

    /// Best-effort bulk delete; missing blobs are not an error.
    async fn delete_many(&self, descriptors: &[BlobDescriptor]) -> CoreResult<()>;
}
