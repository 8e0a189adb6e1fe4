//! Client for the hosted store: a REST table of marker rows plus an object
//! bucket for photos.
//!
//! Rows are addressed PostgREST-style (`/rest/v1/<table>?id=eq.<id>`), objects
//! through `/storage/v1/object/<bucket>/<name>`. Both take the anon key as
//! `apikey` and as a bearer token.

use crate::backend::MarkerBackend;
use crate::config::HostedConfig;
use crate::error::{rejected, SyncError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use marker_types::{DataUrl, MarkerDraft, MarkerRecord};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A row as the hosted table returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct HostedRow {
    pub id: Value,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub observed_date: Option<NaiveDate>,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A row to insert; the table assigns `id` and `created_at`.
#[derive(Debug, Clone, Serialize)]
pub struct NewHostedRow {
    pub lat: f64,
    pub lng: f64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub observed_date: Option<NaiveDate>,
    pub image_path: Option<String>,
}

impl NewHostedRow {
    pub fn from_record(record: &MarkerRecord, image_path: Option<String>) -> Self {
        Self {
            lat: record.lat,
            lng: record.lng,
            title: Some(record.title.clone()).filter(|t| !t.is_empty()),
            description: record.description.clone(),
            observed_date: record.observed_date,
            image_path,
        }
    }
}

pub struct HostedStore {
    config: HostedConfig,
    client: reqwest::Client,
}

impl HostedStore {
    pub fn new(config: HostedConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.config.url, self.config.table)
    }

    fn object_url(&self, name: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.config.url,
            self.config.bucket,
            urlencoding::encode(name)
        )
    }

    pub fn public_url(&self, name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.config.url,
            self.config.bucket,
            urlencoding::encode(name)
        )
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.config.anon_key)
            .bearer_auth(&self.config.anon_key)
    }

    pub async fn select_all(&self) -> Result<Vec<HostedRow>, SyncError> {
        let url = format!("{}?select=*&order=created_at.asc", self.table_url());
        let resp = self.authed(self.client.get(url)).send().await?;
        if !resp.status().is_success() {
            return Err(rejected(resp).await);
        }
        Ok(resp.json().await?)
    }

    pub async fn insert(&self, row: &NewHostedRow) -> Result<HostedRow, SyncError> {
        let resp = self
            .authed(self.client.post(self.table_url()))
            .header("Prefer", "return=representation")
            .json(&[row])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(rejected(resp).await);
        }
        let mut rows: Vec<HostedRow> = resp.json().await?;
        rows.pop()
            .ok_or_else(|| SyncError::Decode("insert returned no row".to_string()))
    }

    /// Deletes the row with `id`, returning it, or `None` if there was no such row.
    pub async fn delete(&self, id: &str) -> Result<Option<HostedRow>, SyncError> {
        let url = format!("{}?id=eq.{}", self.table_url(), urlencoding::encode(id));
        let resp = self
            .authed(self.client.delete(url))
            .header("Prefer", "return=representation")
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(rejected(resp).await);
        }
        let mut rows: Vec<HostedRow> = resp.json().await?;
        Ok(rows.pop())
    }

    pub async fn upload(&self, name: &str, bytes: Vec<u8>, mime: &str) -> Result<(), SyncError> {
        let resp = self
            .authed(self.client.post(self.object_url(name)))
            .header("Content-Type", mime)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(rejected(resp).await);
        }
        Ok(())
    }

    pub async fn remove_object(&self, name: &str) -> Result<(), SyncError> {
        let url = format!(
            "{}/storage/v1/object/{}",
            self.config.url, self.config.bucket
        );
        let resp = self
            .authed(self.client.delete(url))
            .json(&serde_json::json!({ "prefixes": [name] }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(rejected(resp).await);
        }
        Ok(())
    }

    /// Best-effort object removal; failures are only logged.
    pub async fn discard_object(&self, name: &str) {
        if let Err(e) = self.remove_object(name).await {
            log::error!("Failed to delete image {} from storage: {}", name, e);
        }
    }

    /// Normalises a hosted row into the shape the rest of the app uses.
    pub fn to_record(&self, row: HostedRow) -> MarkerRecord {
        let id = match row.id {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        let image_url = row.image_path.map(|path| {
            if path.starts_with("http://") || path.starts_with("https://") {
                path
            } else {
                self.public_url(&path)
            }
        });
        MarkerRecord {
            id,
            lat: row.lat,
            lng: row.lng,
            title: row.title.unwrap_or_default(),
            description: row.description,
            observed_date: row.observed_date,
            image_url,
            created_at: row.created_at.as_deref().and_then(parse_timestamp),
            extra: row.extra,
        }
    }
}

/// Accepts RFC 3339 and zone-less timestamps (read as UTC).
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

pub struct HostedBackend {
    store: HostedStore,
}

impl HostedBackend {
    pub fn new(config: HostedConfig) -> Self {
        Self {
            store: HostedStore::new(config),
        }
    }

    /// Uploads the inline photo. Failures are logged and yield `None`.
    async fn upload_photo(&self, data_url: &str) -> Option<String> {
        let decoded = match DataUrl::parse(data_url) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("Skipping photo that could not be decoded: {}", e);
                return None;
            }
        };
        let stem = format!(
            "{}-{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        );
        let name = decoded.file_name(&stem);
        let mime = decoded.mime();
        match self.store.upload(&name, decoded.into_bytes(), &mime).await {
            Ok(()) => Some(name),
            Err(e) => {
                log::warn!("Photo upload failed, saving marker without it: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl MarkerBackend for HostedBackend {
    fn name(&self) -> &'static str {
        "hosted"
    }

    async fn list(&self) -> Result<Vec<MarkerRecord>, SyncError> {
        let rows = self.store.select_all().await?;
        let mut markers: Vec<MarkerRecord> =
            rows.into_iter().map(|r| self.store.to_record(r)).collect();
        // Rows without a timestamp sort first; the sort is stable.
        markers.sort_by_key(|m| m.created_at);
        Ok(markers)
    }

    async fn create(&self, draft: MarkerDraft) -> Result<MarkerRecord, SyncError> {
        draft.validate()?;
        let (record, image_data) = draft.into_parts();
        if !record.extra.is_empty() {
            log::debug!(
                "Hosted table has no column for {:?}; dropping",
                record.extra.keys().collect::<Vec<_>>()
            );
        }

        let image_path = match image_data {
            Some(data_url) => self.upload_photo(&data_url).await,
            None => None,
        };

        let row = NewHostedRow::from_record(&record, image_path.clone());
        match self.store.insert(&row).await {
            Ok(inserted) => Ok(self.store.to_record(inserted)),
            Err(e) => {
                if let Some(name) = image_path {
                    self.store.discard_object(&name).await;
                }
                Err(e)
            }
        }
    }

    async fn delete(&self, id: &str) -> Result<(), SyncError> {
        let removed = self
            .store
            .delete(id)
            .await?
            .ok_or_else(|| SyncError::NotFound(id.to_string()))?;
        if let Some(path) = removed.image_path {
            self.store.discard_object(&path).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{spawn_fake_hosted, PNG_DATA_URL};

    #[tokio::test]
    async fn test_create_list_delete_with_photo() {
        let fake = spawn_fake_hosted().await;
        let backend = HostedBackend::new(fake.config());

        let created = backend
            .create(
                MarkerDraft::new(22.05, -159.49, "Coqui")
                    .with_description("heard at dusk")
                    .with_image_data(PNG_DATA_URL),
            )
            .await
            .unwrap();
        assert_eq!(created.id, "1");
        assert_eq!(created.title, "Coqui");
        let image_url = created.image_url.clone().unwrap();
        assert!(image_url.starts_with(&format!("{}/storage/v1/object/public/uploads/", fake.url)));
        assert_eq!(fake.object_count(), 1);

        let resp = reqwest::get(&image_url).await.unwrap();
        let expected = DataUrl::parse(PNG_DATA_URL).unwrap();
        assert_eq!(resp.bytes().await.unwrap().as_ref(), expected.bytes());

        let listed = backend.list().await.unwrap();
        assert_eq!(listed, vec![created.clone()]);

        backend.delete(&created.id).await.unwrap();
        assert!(backend.list().await.unwrap().is_empty());
        assert_eq!(fake.object_count(), 0);

        assert!(matches!(
            backend.delete(&created.id).await,
            Err(SyncError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_sorts_by_creation_time() {
        let fake = spawn_fake_hosted().await;
        let backend = HostedBackend::new(fake.config());
        for title in ["Mongoose", "Coqui", "Bingabing"] {
            backend.create(MarkerDraft::new(0.0, 0.0, title)).await.unwrap();
        }

        // The fake returns rows newest first.
        let titles: Vec<_> = backend
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(titles, ["Mongoose", "Coqui", "Bingabing"]);
    }

    #[tokio::test]
    async fn test_failed_insert_discards_uploaded_photo() {
        let fake = spawn_fake_hosted().await;
        fake.fail_inserts(true);
        let backend = HostedBackend::new(fake.config());

        let err = backend
            .create(MarkerDraft::new(1.0, 1.0, "Coqui").with_image_data(PNG_DATA_URL))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Rejected { status: 500, .. }));
        assert_eq!(fake.object_count(), 0);
    }

    #[tokio::test]
    async fn test_bad_photo_is_skipped() {
        let fake = spawn_fake_hosted().await;
        let backend = HostedBackend::new(fake.config());

        let created = backend
            .create(MarkerDraft::new(1.0, 1.0, "Coqui").with_image_data("data:image/png;base64,@@"))
            .await
            .unwrap();
        assert!(created.image_url.is_none());
        assert_eq!(fake.object_count(), 0);
    }

    #[tokio::test]
    async fn test_wrong_key_is_rejected() {
        let fake = spawn_fake_hosted().await;
        let mut config = fake.config();
        config.anon_key = "wrong".to_string();
        let backend = HostedBackend::new(config);
        assert!(matches!(
            backend.list().await,
            Err(SyncError::Rejected { status: 401, .. })
        ));
    }

    #[test]
    fn test_to_record_normalises_rows() {
        let store = HostedStore::new(HostedConfig::new("https://h.example", "k"));
        let row: HostedRow = serde_json::from_value(serde_json::json!({
            "id": 42,
            "lat": 22.0,
            "lng": -159.0,
            "title": null,
            "description": "seen",
            "observed_date": "2024-02-03",
            "image_path": "a b.png",
            "created_at": "2024-02-03T04:05:06.789+00:00",
            "user_id": "u1"
        }))
        .unwrap();

        let record = store.to_record(row);
        assert_eq!(record.id, "42");
        assert_eq!(record.title, "");
        assert_eq!(
            record.image_url.as_deref(),
            Some("https://h.example/storage/v1/object/public/uploads/a%20b.png")
        );
        assert_eq!(record.observed_date, NaiveDate::from_ymd_opt(2024, 2, 3));
        assert_eq!(record.extra["user_id"], "u1");
        assert!(record.created_at.is_some());
    }

    #[test]
    fn test_parse_timestamp() {
        assert!(parse_timestamp("2024-02-03T04:05:06Z").is_some());
        assert!(parse_timestamp("2024-02-03T04:05:06.123456").is_some());
        assert!(parse_timestamp("2024-02-03 04:05:06").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
