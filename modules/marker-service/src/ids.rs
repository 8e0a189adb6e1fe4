//! Marker identifiers: `<unix-millis>-<uuid hex>`.

use crate::error::StoreError;
use chrono::Utc;
use marker_types::MarkerRecord;
use uuid::Uuid;

const MAX_ID_LEN: usize = 128;

pub fn generate() -> String {
    format!(
        "{}-{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    )
}

/// Ids name blob files, so only a conservative alphabet is accepted.
pub fn is_valid(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Gives the record a fresh id when it has none, otherwise checks the one it carries.
pub fn assign(record: &mut MarkerRecord) -> Result<(), StoreError> {
    if !record.has_id() {
        record.id = generate();
        return Ok(());
    }
    if !is_valid(&record.id) {
        return Err(StoreError::InvalidId(record.id.clone()));
    }
    Ok(())
}
