//! SQLite marker store. One row per marker; inserts and deletes are single statements.

use super::{prepare, MarkerStore};
use crate::error::StoreError;
use marker_types::MarkerRecord;
use rusqlite::{Connection, ErrorCode, Result as SqliteResult};
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};

const COLUMNS: &str =
    "id, lat, lng, title, description, observed_date, image_url, extra, created_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &str) -> SqliteResult<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.create_tables()?;
        log::info!("Marker database: {}", path);
        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn create_tables(&self) -> SqliteResult<()> {
        let conn = self.conn();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS markers (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                lat REAL NOT NULL,
                lng REAL NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                observed_date TEXT,
                image_url TEXT,
                extra TEXT,
                created_at TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_markers_created ON markers(created_at, seq)",
            [],
        )?;
        Ok(())
    }
}

impl MarkerStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn list(&self) -> Result<Vec<MarkerRecord>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM markers ORDER BY created_at ASC, seq ASC",
            COLUMNS
        ))?;
        let records = stmt
            .query_map([], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn create(&self, mut record: MarkerRecord) -> Result<MarkerRecord, StoreError> {
        prepare(&mut record)?;
        let extra = (!record.extra.is_empty()).then(|| Value::Object(record.extra.clone()));

        let conn = self.conn();
        let inserted = conn.execute(
            &format!(
                "INSERT INTO markers ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                COLUMNS
            ),
            rusqlite::params![
                record.id,
                record.lat,
                record.lng,
                record.title,
                record.description,
                record.observed_date,
                record.image_url,
                extra,
                record.created_at,
            ],
        );
        match inserted {
            Ok(_) => Ok(record),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(StoreError::DuplicateId(record.id))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, id: &str) -> Result<MarkerRecord, StoreError> {
        let conn = self.conn();
        let removed = conn.query_row(
            &format!("DELETE FROM markers WHERE id = ?1 RETURNING {}", COLUMNS),
            rusqlite::params![id],
            row_to_record,
        );
        match removed {
            Ok(record) => Ok(record),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(StoreError::NotFound(id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn contains(&self, id: &str) -> Result<bool, StoreError> {
        let conn = self.conn();
        let found: i64 = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM markers WHERE id = ?1)",
            rusqlite::params![id],
            |r| r.get(0),
        )?;
        Ok(found != 0)
    }

    fn count(&self) -> Result<usize, StoreError> {
        let conn = self.conn();
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM markers", [], |r| r.get(0))?;
        Ok(total as usize)
    }
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<MarkerRecord> {
    let extra = match row.get::<_, Option<Value>>(7)? {
        Some(Value::Object(map)) => map,
        _ => Default::default(),
    };
    Ok(MarkerRecord {
        id: row.get(0)?,
        lat: row.get(1)?,
        lng: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        observed_date: row.get(5)?,
        image_url: row.get(6)?,
        extra,
        created_at: Some(row.get(8)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::conformance;

    fn memory() -> SqliteStore {
        SqliteStore::open(":memory:").unwrap()
    }

    #[test]
    fn test_conformance() {
        conformance::create_then_list(&memory());
        conformance::keeps_creation_order(&memory());
        conformance::delete_unknown_leaves_collection(&memory());
        conformance::rejects_duplicate_ids(&memory());
        conformance::preserves_extra_fields(&memory());
    }

    #[test]
    fn test_reopen_keeps_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("markers.db");
        let path = path.to_str().unwrap();

        let created = {
            let store = SqliteStore::open(path).unwrap();
            store.create(conformance::coqui()).unwrap()
        };

        let store = SqliteStore::open(path).unwrap();
        assert_eq!(store.list().unwrap(), vec![created]);
    }

    #[test]
    fn test_orders_by_creation_time() {
        let store = memory();
        let mut late = conformance::coqui();
        late.title = "late".to_string();
        late.created_at = Some("2024-06-01T00:00:00Z".parse().unwrap());
        let mut early = conformance::coqui();
        early.title = "early".to_string();
        early.created_at = Some("2024-01-01T00:00:00Z".parse().unwrap());

        store.create(late).unwrap();
        store.create(early).unwrap();

        let titles: Vec<_> = store.list().unwrap().into_iter().map(|m| m.title).collect();
        assert_eq!(titles, ["early", "late"]);
    }
}
