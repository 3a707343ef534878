// src/core/blobstore/gcs.rs

//! `BlobStore` implementation backed by the GCS JSON API over `reqwest`.
//!
//! Authentication is a bearer token sourced from configuration; this system
//! does not implement a full OAuth2/ADC flow, since nothing upstream of it
//! specifies one.

use crate::core::blobstore::{BlobDescriptor, BlobStore};
use crate::core::errors::{CoreError, CoreResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

const JSON_API_BASE: &str = "https://storage.googleapis.com/storage/v1/b";
const UPLOAD_API_BASE: &str = "https://storage.googleapis.com/download/storage/v1/b";

pub struct GcsBlobStore {
    http: reqwest::Client,
    bucket: String,
    access_token: String,
}

#[derive(Deserialize)]
struct ListObjectsResponse {
    #[serde(default)]
    items: Vec<ObjectItem>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct ObjectItem {
    name: String,
}

impl GcsBlobStore {
    pub fn new(bucket: impl Into<String>, access_token: impl Into<String>) -> CoreResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(GcsBlobStore {
            http,
            bucket: bucket.into(),
            access_token: access_token.into(),
        })
    }

    fn bearer(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.bearer_auth(&self.access_token)
    }
}

#[async_trait]
impl BlobStore for GcsBlobStore {
    async fn list(&self, prefix: &str) -> CoreResult<Vec<BlobDescriptor>> {
        let mut out = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let url = format!("{JSON_API_BASE}/{}/o", self.bucket);
            let mut req = self.bearer(self.http.get(&url)).query(&[("prefix", prefix)]);
            if let Some(token) = &page_token {
                req = req.query(&[("pageToken", token)]);
            }
            let resp = req.send().await?;
            if resp.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(out);
            }
            let resp = resp.error_for_status()?;
            let parsed: ListObjectsResponse = resp.json().await?;
            out.extend(parsed.items.into_iter().map(|item| BlobDescriptor {
                bucket: self.bucket.clone(),
                name: item.name,
            }));
            match parsed.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(out)
    }

    async fn download(&self, descriptor: &BlobDescriptor, to_path: &Path) -> CoreResult<()> {
        let url = format!(
            "{UPLOAD_API_BASE}/{}/o/{}",
            descriptor.bucket,
            urlencoding_path(&descriptor.name)
        );
        let resp = self
            .bearer(self.http.get(&url))
            .query(&[("alt", "media")])
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CoreError::BlobNotFound(descriptor.name.clone()));
        }
        let resp = resp.error_for_status()?;
        let bytes = resp.bytes().await?;
        if let Some(parent) = to_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(to_path, &bytes).await?;
        Ok(())
    }

    async fn copy(&self, src: &BlobDescriptor, dst_name: &str) -> CoreResult<()> {
        let url = format!(
            "{JSON_API_BASE}/{}/o/{}/copyTo/b/{}/o/{}",
            src.bucket,
            urlencoding_path(&src.name),
            self.bucket,
            urlencoding_path(dst_name)
        );
        let resp = self.bearer(self.http.post(&url)).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CoreError::BlobNotFound(src.name.clone()));
        }
        resp.error_for_status()?;
        Ok(())
    }

    async fn delete_many(&self, descriptors: &[BlobDescriptor]) -> CoreResult<()> {
        for descriptor in descriptors {
            let url = format!(
                "{JSON_API_BASE}/{}/o/{}",
                descriptor.bucket,
                urlencoding_path(&descriptor.name)
            );
            let resp = self.bearer(self.http.delete(&url)).send().await?;
            if resp.status() == reqwest::StatusCode::NOT_FOUND {
                continue;
            }
            if let Err(err) = resp.error_for_status() {
                warn!(blob = %descriptor.name, error = %err, "failed to delete blob, continuing");
            }
        }
        Ok(())
    }
}

fn urlencoding_path(s: &str) -> String {
    s.replace('/', "%2F")
}
