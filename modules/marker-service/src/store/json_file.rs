//! Flat-file marker store: one JSON array, rewritten on every change.

use super::{prepare, MarkerStore};
use crate::error::StoreError;
use crate::ids;
use marker_types::MarkerRecord;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tempfile::NamedTempFile;

pub struct JsonFileStore {
    path: PathBuf,
    // Serialises every read-modify-write cycle in this process.
    writer: Mutex<()>,
}

impl JsonFileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        log::info!("Marker file: {}", path.display());
        Ok(Self {
            path,
            writer: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read_all(&self) -> Result<Vec<MarkerRecord>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    /// Replaces the file atomically: readers see the old or the new collection, never half.
    fn write_all(&self, records: &[MarkerRecord]) -> Result<(), StoreError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, records)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| StoreError::StorageUnavailable(e.error.to_string()))?;
        Ok(())
    }
}

impl MarkerStore for JsonFileStore {
    fn backend(&self) -> &'static str {
        "json"
    }

    /// Records written by older clients may lack an id; they get one here and
    /// the file is rewritten so the id sticks.
    fn list(&self) -> Result<Vec<MarkerRecord>, StoreError> {
        let _guard = self.lock();
        let mut records = self.read_all()?;

        let mut changed = 0;
        for record in records.iter_mut().filter(|r| !r.has_id()) {
            record.id = ids::generate();
            changed += 1;
        }
        if changed > 0 {
            log::info!("Assigned ids to {} legacy markers", changed);
            self.write_all(&records)?;
        }
        Ok(records)
    }

    fn create(&self, mut record: MarkerRecord) -> Result<MarkerRecord, StoreError> {
        prepare(&mut record)?;

        let _guard = self.lock();
        let mut records = self.read_all()?;
        if records.iter().any(|r| r.id == record.id) {
            return Err(StoreError::DuplicateId(record.id));
        }
        records.push(record.clone());
        self.write_all(&records)?;
        Ok(record)
    }

    fn delete(&self, id: &str) -> Result<MarkerRecord, StoreError> {
        let _guard = self.lock();
        let mut records = self.read_all()?;
        let idx = records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let removed = records.remove(idx);
        self.write_all(&records)?;
        Ok(removed)
    }

    fn contains(&self, id: &str) -> Result<bool, StoreError> {
        let _guard = self.lock();
        Ok(self.read_all()?.iter().any(|r| r.id == id))
    }

    fn count(&self) -> Result<usize, StoreError> {
        let _guard = self.lock();
        Ok(self.read_all()?.len())
    }
}
