use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which record store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Json,
    Sqlite,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" | "file" => Ok(StoreKind::Json),
            "sqlite" | "db" => Ok(StoreKind::Sqlite),
            other => Err(format!("unknown marker store {:?}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub store: StoreKind,
    pub file_path: PathBuf,
    pub db_path: String,
    pub uploads_dir: PathBuf,
    pub uploads_url: String,
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9110,
            store: StoreKind::Json,
            file_path: PathBuf::from("./markers.json"),
            db_path: "./markers.db".to_string(),
            uploads_dir: PathBuf::from("./public/uploads"),
            uploads_url: "/uploads".to_string(),
            // photos arrive inline as base64
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("MARKER_SERVICE_HOST").unwrap_or(defaults.host),
            port: parse_var("MARKER_SERVICE_PORT").unwrap_or(defaults.port),
            store: parse_var("MARKER_STORE").unwrap_or(defaults.store),
            file_path: env::var("MARKER_FILE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.file_path),
            db_path: env::var("MARKER_DB_PATH").unwrap_or(defaults.db_path),
            uploads_dir: env::var("MARKER_UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.uploads_dir),
            uploads_url: env::var("MARKER_UPLOADS_URL").unwrap_or(defaults.uploads_url),
            max_body_bytes: parse_var("MARKER_MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
        }
    }

    /// Everything under one directory. Used by tests and local tooling.
    pub fn in_dir(dir: &Path, store: StoreKind) -> Self {
        Self {
            store,
            file_path: dir.join("markers.json"),
            db_path: dir.join("markers.db").to_string_lossy().into_owned(),
            uploads_dir: dir.join("uploads"),
            ..Self::default()
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    let raw = env::var(name).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(e) => {
            log::warn!("Ignoring {}={:?}: {}", name, raw, e);
            None
        }
    }
}
