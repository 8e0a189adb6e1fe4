//! One-shot copy of a flat-file marker collection into the hosted store.
//!
//! Local photos referenced by `imageUrl` are uploaded to the bucket under
//! their file name; each marker becomes one table row. Failures are logged
//! per marker and the run continues.

use crate::error::SyncError;
use crate::hosted::{HostedStore, NewHostedRow};
use marker_types::{image_mime_for_extension, MarkerRecord};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub inserted: usize,
    pub failed: usize,
    pub images_uploaded: usize,
    pub images_missing: usize,
}

/// Reads the flat file as a JSON array, leaving each entry to be parsed on its own.
pub async fn read_markers_file(path: &Path) -> Result<Vec<Value>, SyncError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SyncError::Unavailable(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&raw).map_err(|e| SyncError::Decode(format!("{}: {}", path.display(), e)))
}

/// Parses one entry of the flat file. Numeric ids are accepted as text.
fn parse_entry(mut entry: Value) -> Result<MarkerRecord, serde_json::Error> {
    if let Some(id) = entry.get_mut("id").filter(|id| id.is_number()) {
        *id = Value::String(id.to_string());
    }
    serde_json::from_value(entry)
}

pub async fn migrate(
    store: &HostedStore,
    markers_file: &Path,
    uploads_dir: &Path,
) -> Result<MigrationReport, SyncError> {
    let entries = read_markers_file(markers_file).await?;
    log::info!("Migrating {} markers from {}", entries.len(), markers_file.display());

    let mut report = MigrationReport::default();
    for (idx, entry) in entries.into_iter().enumerate() {
        let marker = match parse_entry(entry) {
            Ok(marker) => marker,
            Err(e) => {
                log::error!("Skipping entry {}: {}", idx, e);
                report.failed += 1;
                continue;
            }
        };

        let image_path = match &marker.image_url {
            Some(url) => upload_local_image(store, url, uploads_dir, &mut report).await,
            None => None,
        };

        let row = NewHostedRow::from_record(&marker, image_path);
        match store.insert(&row).await {
            Ok(inserted) => {
                log::info!("Inserted marker id={}", inserted.id);
                report.inserted += 1;
            }
            Err(e) => {
                log::error!(
                    "Insert error for marker {:?} ({}): {}",
                    marker.id,
                    marker.title,
                    e
                );
                report.failed += 1;
            }
        }
    }

    log::info!("Migration complete: {:?}", report);
    Ok(report)
}

/// Uploads `<uploads_dir>/<file name of url>`, returning the object name on success.
async fn upload_local_image(
    store: &HostedStore,
    url: &str,
    uploads_dir: &Path,
    report: &mut MigrationReport,
) -> Option<String> {
    let file_name = url.rsplit('/').next().filter(|n| !n.is_empty())?;
    let local = uploads_dir.join(file_name);

    let bytes = match tokio::fs::read(&local).await {
        Ok(bytes) => bytes,
        Err(_) => {
            log::warn!("Local image not found: {}", local.display());
            report.images_missing += 1;
            return None;
        }
    };

    let mime = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .and_then(image_mime_for_extension)
        .unwrap_or("application/octet-stream");

    log::info!("Uploading {}", file_name);
    match store.upload(file_name, bytes, mime).await {
        Ok(()) => {
            report.images_uploaded += 1;
            Some(file_name.to_string())
        }
        Err(e) => {
            log::error!("Upload error for {}: {}", file_name, e);
            None
        }
    }
}
