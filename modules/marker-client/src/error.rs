use marker_types::{DataUrlError, DraftError};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("marker storage unavailable: {0}")]
    Unavailable(String),
    #[error("marker not found: {0}")]
    NotFound(String),
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error(transparent)]
    InvalidDraft(#[from] DraftError),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SyncError::Decode(e.to_string())
        } else {
            SyncError::Unavailable(e.to_string())
        }
    }
}

impl From<DataUrlError> for SyncError {
    fn from(e: DataUrlError) -> Self {
        SyncError::Decode(e.to_string())
    }
}

/// Turns a non-2xx reply into `Rejected`, keeping the server's `{"error"}` text when present.
pub(crate) async fn rejected(resp: reqwest::Response) -> SyncError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("error").to_string()
            } else {
                body
            }
        });
    SyncError::Rejected {
        status: status.as_u16(),
        message,
    }
}
