//! Marker operations as the HTTP layer sees them: the record store plus the
//! image side-car.

use crate::blobs::BlobStore;
use crate::error::StoreError;
use crate::ids;
use crate::store::MarkerStore;
use marker_types::{MarkerDraft, MarkerRecord};
use std::sync::Arc;

pub struct Markers {
    store: Arc<dyn MarkerStore>,
    blobs: BlobStore,
}

impl Markers {
    pub fn new(store: Arc<dyn MarkerStore>, blobs: BlobStore) -> Self {
        Self { store, blobs }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub fn list(&self) -> Result<Vec<MarkerRecord>, StoreError> {
        self.store.list()
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        self.store.count()
    }

    /// Stores a new marker. A photo that cannot be decoded or written is
    /// logged and dropped; the marker is still saved.
    pub fn create(&self, draft: MarkerDraft) -> Result<MarkerRecord, StoreError> {
        draft.validate()?;
        let (mut record, image_data) = draft.into_parts();

        // The blob is named after the id, so the id must exist first.
        ids::assign(&mut record)?;
        if self.store.contains(&record.id)? {
            return Err(StoreError::DuplicateId(record.id));
        }

        let mut saved_blob = None;
        if let Some(data_url) = image_data {
            match self.blobs.store(&data_url, &record.id) {
                Ok(url) => {
                    record.image_url = Some(url.clone());
                    saved_blob = Some(url);
                }
                Err(e) => log::warn!("Failed to save image for marker {}: {}", record.id, e),
            }
        }

        match self.store.create(record) {
            Ok(stored) => {
                log::info!(
                    "Created marker {} ({}) at {}, {}",
                    stored.id,
                    stored.title,
                    stored.lat,
                    stored.lng
                );
                Ok(stored)
            }
            Err(e) => {
                if let Some(url) = saved_blob {
                    self.blobs.remove(&url);
                }
                Err(e)
            }
        }
    }

    /// Removes the marker and, best effort, its photo.
    pub fn delete(&self, id: &str) -> Result<MarkerRecord, StoreError> {
        let removed = self.store.delete(id)?;
        if let Some(url) = &removed.image_url {
            self.blobs.remove(url);
        }
        log::info!("Deleted marker {}", id);
        Ok(removed)
    }
}
