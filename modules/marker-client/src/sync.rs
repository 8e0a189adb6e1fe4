//! The presentation layer's single entry point for markers.
//!
//! `MarkerSync` owns the in-memory marker list and one [`MarkerBackend`],
//! picked when it is built. Call sites never look at configuration.

use crate::backend::MarkerBackend;
use crate::config::BackendConfig;
use crate::error::SyncError;
use crate::file_api::FileApiBackend;
use crate::hosted::HostedBackend;
use chrono::Local;
use marker_types::{MarkerDraft, MarkerRecord};

pub struct MarkerSync {
    backend: Box<dyn MarkerBackend>,
    markers: Vec<MarkerRecord>,
}

impl MarkerSync {
    pub fn new(backend: Box<dyn MarkerBackend>) -> Self {
        Self {
            backend,
            markers: Vec::new(),
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        let backend: Box<dyn MarkerBackend> = match config {
            BackendConfig::FileApi { base_url } => Box::new(FileApiBackend::new(base_url)),
            BackendConfig::Hosted(hosted) => Box::new(HostedBackend::new(hosted.clone())),
        };
        log::info!("Markers sync through the {} backend", backend.name());
        Self::new(backend)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// The markers as of the last load or change.
    pub fn markers(&self) -> &[MarkerRecord] {
        &self.markers
    }

    pub fn get(&self, id: &str) -> Option<&MarkerRecord> {
        self.markers.iter().find(|m| m.id == id)
    }

    /// Replaces the local list with what the backend holds.
    pub async fn load(&mut self) -> Result<&[MarkerRecord], SyncError> {
        match self.backend.list().await {
            Ok(markers) => {
                self.markers = markers;
                Ok(&self.markers)
            }
            Err(e) => {
                log::error!("Failed to load markers: {}", e);
                Err(e)
            }
        }
    }

    /// Saves a new marker. The observed date defaults to today.
    pub async fn add(&mut self, mut draft: MarkerDraft) -> Result<MarkerRecord, SyncError> {
        draft.validate()?;
        if draft.observed_date.is_none() {
            draft.observed_date = Some(Local::now().date_naive());
        }

        let stored = self.backend.create(draft).await.map_err(|e| {
            log::error!("Failed to save marker: {}", e);
            e
        })?;
        self.markers.push(stored.clone());
        Ok(stored)
    }

    /// Deletes a marker. A marker the backend no longer knows is dropped
    /// locally as well, and `NotFound` is still reported.
    pub async fn remove(&mut self, id: &str) -> Result<(), SyncError> {
        let result = self.backend.delete(id).await;
        match &result {
            Ok(()) | Err(SyncError::NotFound(_)) => self.markers.retain(|m| m.id != id),
            Err(e) => log::error!("Failed to delete marker {}: {}", id, e),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{spawn_fake_hosted, spawn_service, PNG_DATA_URL};

    async fn file_sync(dir: &std::path::Path) -> MarkerSync {
        let base_url = spawn_service(dir).await;
        MarkerSync::from_config(&BackendConfig::FileApi { base_url })
    }

    #[tokio::test]
    async fn test_add_load_remove_through_file_api() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sync = file_sync(tmp.path()).await;
        assert_eq!(sync.backend_name(), "file-api");
        assert!(sync.load().await.unwrap().is_empty());

        let created = sync
            .add(MarkerDraft::new(22.05, -159.49, "Coqui").with_description("heard at dusk"))
            .await
            .unwrap();
        assert_eq!(created.observed_date, Some(Local::now().date_naive()));
        assert_eq!(sync.markers(), &[created.clone()]);

        // a fresh facade sees the same thing
        let mut other = file_sync(tmp.path()).await;
        assert_eq!(other.load().await.unwrap(), &[created.clone()]);

        sync.remove(&created.id).await.unwrap();
        assert!(sync.markers().is_empty());
        assert!(sync.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_keeps_explicit_date() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sync = file_sync(tmp.path()).await;
        let date = chrono::NaiveDate::from_ymd_opt(2023, 11, 5).unwrap();
        let created = sync
            .add(MarkerDraft::new(1.0, 2.0, "Mongoose").with_observed_date(date))
            .await
            .unwrap();
        assert_eq!(created.observed_date, Some(date));
    }

    #[tokio::test]
    async fn test_invalid_draft_never_reaches_backend() {
        // Nothing listens here; validation must fail first.
        let mut sync = MarkerSync::from_config(&BackendConfig::FileApi {
            base_url: "http://127.0.0.1:9".to_string(),
        });
        assert!(matches!(
            sync.add(MarkerDraft::new(1.0, 2.0, "")).await,
            Err(SyncError::InvalidDraft(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_unknown_reports_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sync = file_sync(tmp.path()).await;
        let kept = sync.add(MarkerDraft::new(1.0, 2.0, "Coqui")).await.unwrap();

        assert!(matches!(
            sync.remove("nope").await,
            Err(SyncError::NotFound(_))
        ));
        assert_eq!(sync.markers(), &[kept.clone()]);
        assert_eq!(sync.load().await.unwrap(), &[kept]);
    }

    #[tokio::test]
    async fn test_same_shape_from_hosted_backend() {
        let fake = spawn_fake_hosted().await;
        let mut sync = MarkerSync::from_config(&BackendConfig::Hosted(fake.config()));
        assert_eq!(sync.backend_name(), "hosted");

        let created = sync
            .add(MarkerDraft::new(22.05, -159.49, "Coqui").with_image_data(PNG_DATA_URL))
            .await
            .unwrap();
        assert!(created.image_url.is_some());
        assert!(sync.get(&created.id).is_some());

        let loaded = sync.load().await.unwrap().to_vec();
        assert_eq!(loaded, vec![created.clone()]);

        sync.remove(&created.id).await.unwrap();
        assert!(sync.markers().is_empty());
        assert_eq!(fake.row_count(), 0);
        assert_eq!(fake.object_count(), 0);
    }

    #[tokio::test]
    async fn test_load_failure_keeps_previous_list() {
        let fake = spawn_fake_hosted().await;
        let mut sync = MarkerSync::from_config(&BackendConfig::Hosted(fake.config()));
        let created = sync.add(MarkerDraft::new(0.0, 0.0, "Coqui")).await.unwrap();

        fake.fail_selects(true);
        assert!(matches!(
            sync.load().await,
            Err(SyncError::Rejected { status: 503, .. })
        ));
        assert_eq!(sync.markers(), &[created]);
    }
}
