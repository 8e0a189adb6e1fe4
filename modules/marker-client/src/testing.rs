//! In-process servers for client tests: the real marker-service, and a small
//! stand-in for the hosted store.

use crate::config::HostedConfig;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use chrono::DateTime;
use marker_service::config::{Config, StoreKind};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

pub const PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

const FAKE_KEY: &str = "test-anon-key";

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Starts a JSON-file marker-service rooted at `dir` and returns its base URL.
pub async fn spawn_service(dir: &std::path::Path) -> String {
    let config = Config::in_dir(dir, StoreKind::Json);
    let state = marker_service::build_state(&config).unwrap();
    serve(marker_service::router(state, &config)).await
}

#[derive(Default)]
struct FakeState {
    rows: Mutex<Vec<Value>>,
    objects: Mutex<HashMap<String, Vec<u8>>>,
    next_id: AtomicI64,
    fail_inserts: AtomicBool,
    fail_selects: AtomicBool,
}

pub struct FakeHosted {
    pub url: String,
    state: Arc<FakeState>,
}

impl FakeHosted {
    pub fn config(&self) -> HostedConfig {
        HostedConfig::new(&self.url, FAKE_KEY)
    }

    pub fn object_count(&self) -> usize {
        self.state.objects.lock().unwrap().len()
    }

    pub fn row_count(&self) -> usize {
        self.state.rows.lock().unwrap().len()
    }

    pub fn has_object(&self, name: &str) -> bool {
        self.state.objects.lock().unwrap().contains_key(name)
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.state.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_selects(&self, fail: bool) {
        self.state.fail_selects.store(fail, Ordering::SeqCst);
    }
}

pub async fn spawn_fake_hosted() -> FakeHosted {
    let state = Arc::new(FakeState::default());
    let app = Router::new()
        .route(
            "/rest/v1/markers",
            get(select_rows).post(insert_rows).delete(delete_rows),
        )
        .route("/storage/v1/object/uploads/:name", post(upload_object))
        .route("/storage/v1/object/public/uploads/:name", get(public_object))
        .route("/storage/v1/object/uploads", delete(remove_objects))
        .with_state(state.clone());
    FakeHosted {
        url: serve(app).await,
        state,
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    let apikey = headers.get("apikey").and_then(|v| v.to_str().ok());
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    apikey == Some(FAKE_KEY) && bearer == Some(format!("Bearer {}", FAKE_KEY).as_str())
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"message": "Invalid API key"})),
    )
        .into_response()
}

fn id_matches(row: &Value, id: &str) -> bool {
    match &row["id"] {
        Value::String(s) => s == id,
        other => other.to_string() == id,
    }
}

async fn select_rows(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if state.fail_selects.load(Ordering::SeqCst) {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"message": "database is down"})),
        )
            .into_response();
    }
    // newest first, so clients have to sort
    let rows: Vec<Value> = state.rows.lock().unwrap().iter().rev().cloned().collect();
    Json(rows).into_response()
}

async fn insert_rows(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(new_rows): Json<Vec<Value>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if state.fail_inserts.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "insert failed"})),
        )
            .into_response();
    }

    let mut inserted = Vec::new();
    let mut rows = state.rows.lock().unwrap();
    for mut row in new_rows {
        let id = state.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let created_at = DateTime::from_timestamp(1_700_000_000 + id, 0)
            .unwrap()
            .to_rfc3339();
        row["id"] = json!(id);
        row["created_at"] = json!(created_at);
        rows.push(row.clone());
        inserted.push(row);
    }
    (StatusCode::CREATED, Json(inserted)).into_response()
}

async fn delete_rows(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let Some(id) = params.get("id").and_then(|f| f.strip_prefix("eq.")) else {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "missing filter"}))).into_response();
    };
    let mut rows = state.rows.lock().unwrap();
    let removed: Vec<Value> = match rows.iter().position(|r| id_matches(r, id)) {
        Some(idx) => vec![rows.remove(idx)],
        None => Vec::new(),
    };
    Json(removed).into_response()
}

async fn upload_object(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(name): Path<String>,
    body: Bytes,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    state
        .objects
        .lock()
        .unwrap()
        .insert(name.clone(), body.to_vec());
    Json(json!({"Key": format!("uploads/{}", name)})).into_response()
}

async fn public_object(State(state): State<Arc<FakeState>>, Path(name): Path<String>) -> Response {
    match state.objects.lock().unwrap().get(&name) {
        Some(bytes) => bytes.clone().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn remove_objects(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut objects = state.objects.lock().unwrap();
    let removed: Vec<Value> = body["prefixes"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|p| p.as_str())
        .filter(|name| objects.remove(*name).is_some())
        .map(|name| json!({"name": name}))
        .collect();
    Json(removed).into_response()
}
