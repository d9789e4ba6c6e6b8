//! Custom object metadata from the storage service.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::errors::PipelineError;

/// Default base URL of the storage JSON API.
pub const DEFAULT_STORAGE_API_URL: &str = "https://storage.googleapis.com/storage/v1";

/// Reads the user metadata attached to a storage object.
#[async_trait]
pub trait ObjectMetadataSource: Send + Sync {
    /// User metadata of `bucket/filename`; empty when the object has none.
    async fn custom_metadata(
        &self,
        bucket: &str,
        filename: &str,
    ) -> Result<HashMap<String, String>, PipelineError>;
}

#[derive(Deserialize)]
struct ObjectResource {
    #[serde(default)]
    metadata: HashMap<String, String>,
}

/// Storage JSON API client (`GET /b/{bucket}/o/{object}`).
pub struct HttpObjectMetadataSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpObjectMetadataSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn object_url(&self, bucket: &str, filename: &str) -> String {
        format!(
            "{}/b/{}/o/{}",
            self.base_url,
            urlencoding::encode(bucket),
            urlencoding::encode(filename)
        )
    }
}

impl Default for HttpObjectMetadataSource {
    fn default() -> Self {
        Self::new(DEFAULT_STORAGE_API_URL)
    }
}

#[async_trait]
impl ObjectMetadataSource for HttpObjectMetadataSource {
    #[instrument(skip(self))]
    async fn custom_metadata(
        &self,
        bucket: &str,
        filename: &str,
    ) -> Result<HashMap<String, String>, PipelineError> {
        let response = self
            .client
            .get(self.object_url(bucket, filename))
            .send()
            .await
            .map_err(|e| PipelineError::object_metadata(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("Object not found, no custom metadata");
            return Ok(HashMap::new());
        }

        let resource: ObjectResource = response
            .error_for_status()
            .map_err(|e| PipelineError::object_metadata(e.to_string()))?
            .json()
            .await
            .map_err(|e| PipelineError::object_metadata(e.to_string()))?;

        Ok(resource.metadata)
    }
}
