//! Image side-car: inline data URLs become files in the uploads directory.

use crate::error::BlobError;
use marker_types::DataUrl;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

pub struct BlobStore {
    dir: PathBuf,
    url_prefix: String,
}

impl BlobStore {
    pub fn new(dir: impl Into<PathBuf>, url_prefix: &str) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    /// Decodes `data_url` and writes it as `<id>.<ext>`, returning the public URL.
    ///
    /// An existing file is never overwritten.
    pub fn store(&self, data_url: &str, id: &str) -> Result<String, BlobError> {
        let decoded = DataUrl::parse(data_url)?;
        fs::create_dir_all(&self.dir)?;

        let file_name = decoded.file_name(id);
        write_new(&self.dir.join(&file_name), |file| {
            file.write_all(decoded.bytes())?;
            file.sync_all()
        })?;

        log::info!(
            "Saved {} byte image for marker {} as {}",
            decoded.bytes().len(),
            id,
            file_name
        );
        Ok(format!("{}/{}", self.url_prefix, file_name))
    }

    /// Deletes the file behind `url`. Failures are logged, never returned.
    pub fn remove(&self, url: &str) {
        let Some(path) = self.resolve(url) else {
            log::warn!("Not removing image with unexpected URL {:?}", url);
            return;
        };
        match fs::remove_file(&path) {
            Ok(()) => log::info!("Removed image {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("Image {} already gone", path.display())
            }
            Err(e) => log::error!("Failed to delete image file {}: {}", path.display(), e),
        }
    }

    /// Maps a public URL back to a file inside the uploads directory.
    ///
    /// Only the last path segment is used, so the result cannot escape `dir`.
    pub fn resolve(&self, url: &str) -> Option<PathBuf> {
        let path = url.split(['?', '#']).next().unwrap_or_default();
        let name = path.rsplit('/').next()?;
        if name.is_empty() || name == "." || name == ".." || name.contains('\\') {
            return None;
        }
        Some(self.dir.join(name))
    }
}

/// Creates `path` (never replacing an existing file) and fills it with `write`.
/// A file left incomplete by a failed write is removed.
fn write_new(
    path: &Path,
    write: impl FnOnce(&mut File) -> std::io::Result<()>,
) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    let written = write(&mut file);
    drop(file);
    if written.is_err() {
        if let Err(e) = fs::remove_file(path) {
            log::error!("Failed to remove partial image {}: {}", path.display(), e);
        }
    }
    written
}
