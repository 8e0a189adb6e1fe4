//! Axum route handlers for the marker HTTP API.

use crate::error::StoreError;
use crate::service::Markers;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use marker_types::*;
use std::sync::Arc;
use std::time::Instant;

pub struct AppState {
    pub markers: Markers,
    pub start_time: Instant,
}

/// A non-2xx reply with an `{"error": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody::new(self.message))).into_response()
    }
}

// GET /markers
pub async fn list_markers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<MarkerRecord>>, ApiError> {
    match state.markers.list() {
        Ok(markers) => Ok(Json(markers)),
        Err(e) => {
            log::error!("Failed to read markers: {}", e);
            Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read markers",
            ))
        }
    }
}

// POST /markers
pub async fn create_marker(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MarkerDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<MarkerRecord>), ApiError> {
    let Json(draft) = payload.map_err(|rejection| {
        log::warn!("Rejected marker body: {}", rejection.body_text());
        ApiError::new(StatusCode::BAD_REQUEST, rejection.body_text())
    })?;
    match state.markers.create(draft) {
        Ok(marker) => Ok((StatusCode::CREATED, Json(marker))),
        Err(StoreError::InvalidDraft(e)) => Err(ApiError::new(StatusCode::BAD_REQUEST, e.to_string())),
        Err(e @ StoreError::InvalidId(_)) => {
            Err(ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))
        }
        Err(StoreError::DuplicateId(id)) => Err(ApiError::new(
            StatusCode::CONFLICT,
            format!("Marker {} already exists", id),
        )),
        Err(e) => {
            log::error!("Failed to save marker: {}", e);
            Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to save marker",
            ))
        }
    }
}

// DELETE /markers
pub async fn delete_marker(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DeleteMarkerRequest>, JsonRejection>,
) -> Result<Json<DeleteMarkerResponse>, ApiError> {
    // An absent or unreadable body carries no id either.
    let req = payload.map(|Json(req)| req).unwrap_or_default();
    let Some(id) = req.id.filter(|id| !id.is_empty()) else {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Missing id"));
    };
    match state.markers.delete(&id) {
        Ok(_) => Ok(Json(DeleteMarkerResponse { success: true })),
        Err(StoreError::NotFound(_)) => Err(ApiError::new(StatusCode::NOT_FOUND, "Not found")),
        Err(e) => {
            log::error!("Failed to delete marker {}: {}", id, e);
            Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to delete marker",
            ))
        }
    }
}

// GET /rpc/status
pub async fn status(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<RpcResponse<ServiceStatus>>) {
    (
        StatusCode::OK,
        Json(RpcResponse::ok(ServiceStatus {
            running: true,
            uptime_secs: state.start_time.elapsed().as_secs(),
            total_markers: state.markers.count().unwrap_or(0),
            store_backend: state.markers.backend().to_string(),
        })),
    )
}
