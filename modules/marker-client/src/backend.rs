//! The storage capability the facade talks to.

use crate::error::SyncError;
use async_trait::async_trait;
use marker_types::{MarkerDraft, MarkerRecord};

#[async_trait]
pub trait MarkerBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// All markers, oldest first.
    async fn list(&self) -> Result<Vec<MarkerRecord>, SyncError>;

    async fn create(&self, draft: MarkerDraft) -> Result<MarkerRecord, SyncError>;

    async fn delete(&self, id: &str) -> Result<(), SyncError>;
}
