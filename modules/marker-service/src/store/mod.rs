//! Record store: an ordered collection of markers behind one trait.
//!
//! Two backends exist. `JsonFileStore` keeps the whole collection in a single
//! JSON file; `SqliteStore` keeps one row per marker in an embedded database.
//! The backend is chosen once at startup (see [`open`]) and handed to the
//! service as `Arc<dyn MarkerStore>`.

pub mod json_file;
pub mod sqlite;

pub use json_file::JsonFileStore;
pub use sqlite::SqliteStore;

use crate::config::{Config, StoreKind};
use crate::error::StoreError;
use crate::ids;
use chrono::Utc;
use marker_types::MarkerRecord;
use std::sync::Arc;

pub trait MarkerStore: Send + Sync {
    /// Short backend name for logs and status output.
    fn backend(&self) -> &'static str;

    /// Every stored marker, oldest first.
    fn list(&self) -> Result<Vec<MarkerRecord>, StoreError>;

    /// Persists a new marker, assigning an id and creation time when missing.
    fn create(&self, record: MarkerRecord) -> Result<MarkerRecord, StoreError>;

    /// Removes the marker with `id` and returns what was stored.
    fn delete(&self, id: &str) -> Result<MarkerRecord, StoreError>;

    fn contains(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.list()?.iter().any(|m| m.id == id))
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.list()?.len())
    }
}

pub fn open(config: &Config) -> Result<Arc<dyn MarkerStore>, StoreError> {
    let store: Arc<dyn MarkerStore> = match config.store {
        StoreKind::Json => Arc::new(JsonFileStore::open(&config.file_path)?),
        StoreKind::Sqlite => Arc::new(SqliteStore::open(&config.db_path)?),
    };
    log::info!("Using {} marker store", store.backend());
    Ok(store)
}

/// Fills in the generated fields of a record about to be inserted.
fn prepare(record: &mut MarkerRecord) -> Result<(), StoreError> {
    ids::assign(record)?;
    record.strip_reserved_extra();
    if record.created_at.is_none() {
        record.created_at = Some(Utc::now());
    }
    Ok(())
}
