//! Marker Service: HTTP API over a persistent collection of map markers.
//!
//! `GET/POST/DELETE /markers`, uploaded photos under `/uploads`, a status
//! endpoint and a dashboard page.

pub mod blobs;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod ids;
pub mod routes;
pub mod service;
pub mod store;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use blobs::BlobStore;
use config::Config;
use error::StoreError;
use routes::AppState;
use service::Markers;
use std::sync::Arc;
use std::time::Instant;
use tower_http::services::ServeDir;

pub fn build_state(config: &Config) -> Result<Arc<AppState>, StoreError> {
    let store = store::open(config)?;
    let blobs = BlobStore::new(&config.uploads_dir, &config.uploads_url);
    Ok(Arc::new(AppState {
        markers: Markers::new(store, blobs),
        start_time: Instant::now(),
    }))
}

pub fn router(state: Arc<AppState>, config: &Config) -> axum::Router {
    let cors = tower_http::cors::CorsLayer::permissive();

    let mut app = axum::Router::new()
        .route("/", get(dashboard::dashboard))
        .route(
            "/markers",
            get(routes::list_markers)
                .post(routes::create_marker)
                .delete(routes::delete_marker),
        )
        .route("/rpc/status", get(routes::status));

    // Photos are only served from here when their URLs are local paths.
    let blobs = state.markers.blobs();
    let prefix = blobs.url_prefix().to_string();
    if prefix.starts_with('/') && prefix.len() > 1 {
        app = app.nest_service(&prefix, ServeDir::new(blobs.dir()));
    } else {
        log::info!("Uploads URL {:?} is external; not serving uploads", prefix);
    }

    app.with_state(state)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(cors)
}
