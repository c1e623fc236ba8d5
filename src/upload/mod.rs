//! Image upload collaborator
//!
//! Uploads currently resolve to a placeholder image after a fixed delay. A blob
//! store implementation only has to provide [`ImageUploader`].

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use tracing::info;

/// Stores an image and returns where it can be fetched from
#[async_trait]
pub trait ImageUploader: Send + Sync {
    async fn upload(&self, file_name: &str, data: Bytes) -> Result<String, UploadError>;
}

/// Upload errors
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("No image file provided.")]
    NoFile,

    #[error("Failed to upload image.")]
    Failed(String),
}

/// Uploader that sleeps and hands back a placeholder URL
pub struct SimulatedUploader {
    delay: Duration,
}

impl SimulatedUploader {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl ImageUploader for SimulatedUploader {
    async fn upload(&self, file_name: &str, data: Bytes) -> Result<String, UploadError> {
        if data.is_empty() {
            return Err(UploadError::NoFile);
        }

        tokio::time::sleep(self.delay).await;

        let url = placeholder_url(file_name, 64)?;
        info!(file_name, bytes = data.len(), url = %url, "Simulated image upload");
        Ok(url)
    }
}

/// Site-relative placeholder image URL labelled with `query`
pub fn placeholder_url(query: &str, size: u32) -> Result<String, UploadError> {
    let mut url = Url::parse("http://localhost/placeholder.svg")
        .map_err(|e| UploadError::Failed(e.to_string()))?;
    url.query_pairs_mut()
        .append_pair("height", &size.to_string())
        .append_pair("width", &size.to_string())
        .append_pair("query", query);

    Ok(format!("{}?{}", url.path(), url.query().unwrap_or_default()))
}
