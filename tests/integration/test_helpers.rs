//! Shared fixtures for the integration tests: an in-memory blob store and
//! an in-memory serving-engine client, plus a helper to build a valid
//! gzipped tar archive in memory.

use async_trait::async_trait;
use fleetmodeld::core::blobstore::{BlobDescriptor, BlobStore};
use fleetmodeld::core::engine_client::EngineClient;
use fleetmodeld::core::errors::CoreResult;
use fleetmodeld::core::record::{RecordKey, ServingRecord};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

pub fn build_tar_gz_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let encoder = flate2::write::GzEncoder::new(&mut buf, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, content) in entries {
            let mut header = tar::Header::new_gnu();
            let name_bytes = name.as_bytes();
            header.as_old_mut().name[..name_bytes.len()].copy_from_slice(name_bytes);
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, *content).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }
    buf
}

/// An in-memory [`BlobStore`] keyed on the blob's full `name`. `bucket` is
/// ignored, matching the single-bucket-per-service deployment this system
/// assumes.
#[derive(Default)]
pub struct FakeBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl FakeBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, name: impl Into<String>, bytes: Vec<u8>) {
        self.blobs.lock().unwrap().insert(name.into(), bytes);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.blobs.lock().unwrap().contains_key(name)
    }
}

#[async_trait]
impl BlobStore for FakeBlobStore {
    async fn list(&self, prefix: &str) -> CoreResult<Vec<BlobDescriptor>> {
        Ok(self
            .blobs
            .lock()
            .unwrap()
            .keys()
            .filter(|name| name.starts_with(prefix))
            .map(|name| BlobDescriptor {
                bucket: "test-bucket".to_string(),
                name: name.clone(),
            })
            .collect())
    }

    async fn download(&self, descriptor: &BlobDescriptor, to_path: &Path) -> CoreResult<()> {
        let bytes = self.blobs.lock().unwrap().get(&descriptor.name).cloned();
        if let Some(bytes) = bytes {
            tokio::fs::write(to_path, bytes).await?;
        }
        Ok(())
    }

    async fn copy(&self, src: &BlobDescriptor, dst_name: &str) -> CoreResult<()> {
        let bytes = self.blobs.lock().unwrap().get(&src.name).cloned();
        if let Some(bytes) = bytes {
            self.blobs.lock().unwrap().insert(dst_name.to_string(), bytes);
        }
        Ok(())
    }

    async fn delete_many(&self, descriptors: &[BlobDescriptor]) -> CoreResult<()> {
        let mut blobs = self.blobs.lock().unwrap();
        for descriptor in descriptors {
            blobs.remove(&descriptor.name);
        }
        Ok(())
    }
}

/// An in-memory [`EngineClient`] that returns a fixed, externally-mutable
/// view of what the serving engine reports per key.
#[derive(Default)]
pub struct FakeEngineClient {
    status: Mutex<HashMap<RecordKey, Vec<ServingRecord>>>,
}

impl FakeEngineClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&self, key: RecordKey, records: Vec<ServingRecord>) {
        self.status.lock().unwrap().insert(key, records);
    }
}

#[async_trait]
impl EngineClient for FakeEngineClient {
    async fn get_model_status(&self, key: &RecordKey) -> Vec<ServingRecord> {
        self.status.lock().unwrap().get(key).cloned().unwrap_or_default()
    }
}
