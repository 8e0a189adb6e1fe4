//! Shared types for the marker service and its clients.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =====================================================
// Domain Types
// =====================================================

/// A user-placed point on the map.
///
/// Keys the service does not know about are kept in `extra` and written back
/// unchanged, so records created by older clients survive a rewrite of the
/// collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerRecord {
    #[serde(default)]
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, alias = "observed_date", skip_serializing_if = "Option::is_none")]
    pub observed_date: Option<NaiveDate>,
    #[serde(
        default,
        alias = "image_url",
        alias = "image_path",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<String>,
    #[serde(default, alias = "created_at", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MarkerRecord {
    pub fn has_id(&self) -> bool {
        !self.id.trim().is_empty()
    }

    /// Drops `extra` entries that would shadow a typed field on write.
    ///
    /// Serialising both would emit the key twice, and such a record can no
    /// longer be read back.
    pub fn strip_reserved_extra(&mut self) {
        self.extra.retain(|k, _| !RESERVED_KEYS.contains(&k.as_str()));
    }
}

/// Every JSON key, aliases included, that maps onto a typed record or draft field.
pub const RESERVED_KEYS: &[&str] = &[
    "id",
    "lat",
    "lng",
    "title",
    "description",
    "observedDate",
    "observed_date",
    "imageUrl",
    "image_url",
    "image_path",
    "imageData",
    "image_data",
    "createdAt",
    "created_at",
];

/// What a client submits when placing a new marker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, alias = "observed_date", skip_serializing_if = "Option::is_none")]
    pub observed_date: Option<NaiveDate>,
    /// Inline photo as a base64 `data:image/...` URL. Never persisted as-is.
    #[serde(default, alias = "image_data", skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("Please select a species")]
    MissingTitle,
    #[error("Coordinates must be finite numbers")]
    InvalidCoordinates,
}

impl MarkerDraft {
    pub fn new(lat: f64, lng: f64, title: impl Into<String>) -> Self {
        Self {
            lat,
            lng,
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_observed_date(mut self, date: NaiveDate) -> Self {
        self.observed_date = Some(date);
        self
    }

    pub fn with_image_data(mut self, data_url: impl Into<String>) -> Self {
        self.image_data = Some(data_url.into());
        self
    }

    pub fn validate(&self) -> Result<(), DraftError> {
        if self.title.trim().is_empty() {
            return Err(DraftError::MissingTitle);
        }
        if !self.lat.is_finite() || !self.lng.is_finite() {
            return Err(DraftError::InvalidCoordinates);
        }
        Ok(())
    }

    /// Splits the draft into the record to store and the inline image payload.
    pub fn into_parts(self) -> (MarkerRecord, Option<String>) {
        let mut record = MarkerRecord {
            id: self.id.unwrap_or_default(),
            lat: self.lat,
            lng: self.lng,
            title: self.title,
            description: self.description,
            observed_date: self.observed_date,
            image_url: None,
            created_at: None,
            extra: self.extra,
        };
        record.strip_reserved_extra();
        (record, self.image_data)
    }
}

/// Fixed list of categories offered when placing a marker.
pub const SPECIES: &[&str] = &[
    "Coconut Rhinoceros Beetle",
    "Coffee Berry Borer (CBB)/ Coffee Leaf Rust (CLR)",
    "Coqui",
    "Jackson's Chameleon",
    "Little Fire Ant",
    "Mongoose",
    "Naio Thrips",
    "Rose-ringed Parakeet",
    "Rapid ʻŌhiʻa Death (ROD)",
    "Barbados Gooseberry",
    "Bingabing",
    "Common Rush",
];

/// Where the map opens (Kauaʻi).
pub const DEFAULT_MAP_CENTER: (f64, f64) = (22.0594, -159.4995);

pub fn is_known_species(title: &str) -> bool {
    SPECIES.iter().any(|s| *s == title)
}

// =====================================================
// Data URLs
// =====================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataUrlError {
    #[error("not a base64 data URL")]
    NotDataUrl,
    #[error("unsupported media type: {0}")]
    UnsupportedMime(String),
    #[error("invalid base64 payload: {0}")]
    Base64(String),
}

/// A decoded `data:image/<subtype>;base64,<payload>` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    subtype: String,
    bytes: Vec<u8>,
}

impl DataUrl {
    pub fn parse(input: &str) -> Result<Self, DataUrlError> {
        let rest = input
            .trim()
            .strip_prefix("data:")
            .ok_or(DataUrlError::NotDataUrl)?;
        let (mime, payload) = rest
            .split_once(";base64,")
            .ok_or(DataUrlError::NotDataUrl)?;
        if payload.is_empty() {
            return Err(DataUrlError::NotDataUrl);
        }

        let subtype = mime
            .strip_prefix("image/")
            .ok_or_else(|| DataUrlError::UnsupportedMime(mime.to_string()))?;
        // The subtype ends up in a file name.
        if subtype.is_empty()
            || !subtype
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-')
        {
            return Err(DataUrlError::UnsupportedMime(mime.to_string()));
        }

        let bytes = BASE64
            .decode(payload)
            .map_err(|e| DataUrlError::Base64(e.to_string()))?;

        Ok(Self {
            subtype: subtype.to_ascii_lowercase(),
            bytes,
        })
    }

    pub fn from_bytes(subtype: &str, bytes: Vec<u8>) -> Self {
        Self {
            subtype: subtype.to_ascii_lowercase(),
            bytes,
        }
    }

    pub fn mime(&self) -> String {
        format!("image/{}", self.subtype)
    }

    pub fn extension(&self) -> &str {
        if self.subtype == "jpeg" {
            "jpg"
        } else {
            &self.subtype
        }
    }

    pub fn file_name(&self, stem: &str) -> String {
        format!("{}.{}", stem, self.extension())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime(), BASE64.encode(&self.bytes))
    }
}

/// Best guess at an image MIME type from a file extension.
pub fn image_mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

// =====================================================
// HTTP Request/Response Types
// =====================================================

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DeleteMarkerRequest {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteMarkerResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> RpcResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

// =====================================================
// Service Status
// =====================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub running: bool,
    pub uptime_secs: u64,
    pub total_markers: usize,
    pub store_backend: String,
}
