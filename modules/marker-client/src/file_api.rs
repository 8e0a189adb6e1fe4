//! HTTP/JSON client for the standalone marker-service.

use crate::backend::MarkerBackend;
use crate::error::{rejected, SyncError};
use async_trait::async_trait;
use marker_types::*;
use reqwest::StatusCode;

pub struct FileApiBackend {
    base_url: String,
    client: reqwest::Client,
}

impl FileApiBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a path the service handed out, such as an `imageUrl`.
    pub fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    pub async fn status(&self) -> Result<ServiceStatus, SyncError> {
        let resp = self
            .client
            .get(format!("{}/rpc/status", self.base_url))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(rejected(resp).await);
        }
        let rpc: RpcResponse<ServiceStatus> = resp.json().await?;
        rpc.data
            .ok_or_else(|| SyncError::Decode(rpc.error.unwrap_or_else(|| "Unknown error".to_string())))
    }

    fn markers_url(&self) -> String {
        format!("{}/markers", self.base_url)
    }
}

#[async_trait]
impl MarkerBackend for FileApiBackend {
    fn name(&self) -> &'static str {
        "file-api"
    }

    async fn list(&self) -> Result<Vec<MarkerRecord>, SyncError> {
        let resp = self.client.get(self.markers_url()).send().await?;
        if !resp.status().is_success() {
            return Err(rejected(resp).await);
        }
        Ok(resp.json().await?)
    }

    async fn create(&self, draft: MarkerDraft) -> Result<MarkerRecord, SyncError> {
        let resp = self
            .client
            .post(self.markers_url())
            .json(&draft)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(rejected(resp).await);
        }
        Ok(resp.json().await?)
    }

    async fn delete(&self, id: &str) -> Result<(), SyncError> {
        let req = DeleteMarkerRequest {
            id: Some(id.to_string()),
        };
        let resp = self
            .client
            .delete(self.markers_url())
            .json(&req)
            .send()
            .await?;
        match resp.status() {
            s if s.is_success() => {
                let body: DeleteMarkerResponse = resp.json().await?;
                if body.success {
                    Ok(())
                } else {
                    Err(SyncError::Decode("delete reported failure".to_string()))
                }
            }
            StatusCode::NOT_FOUND => Err(SyncError::NotFound(id.to_string())),
            _ => Err(rejected(resp).await),
        }
    }
}
