//! Artifact persistence.
//!
//! Captures land under `<root>/screenshots/` as
//! `capture-<timestamp>.png`, with the prompt text (when present) in a
//! `.txt` sidecar sharing the base name. Timestamps are filesystem-safe
//! ISO 8601 (`2025-12-01T22-31-45-123Z`), which keeps the directory sorted
//! by capture time and lets consumers address artifacts by name alone.

use crate::capture::CapturedImage;
use crate::error::{AppError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A capture persisted to disk.
#[derive(Clone, Debug)]
pub struct SavedCapture {
    /// `capture-<timestamp>` without extension.
    pub base_name: String,
    pub png_path: PathBuf,
    pub timestamp: DateTime<Utc>,
}

impl SavedCapture {
    /// File name of the PNG, the form consumers use to address it.
    pub fn filename(&self) -> String {
        format!("{}.png", self.base_name)
    }

    fn txt_path(&self) -> PathBuf {
        self.png_path.with_extension("txt")
    }
}

/// Stores captured artifacts under a root directory.
pub struct ArtifactStore {
    screenshots_dir: PathBuf,
}

impl ArtifactStore {
    /// Opens (and creates, if needed) `<root>/screenshots/`.
    pub fn new(root: &Path) -> Result<Self> {
        let screenshots_dir = root.join("screenshots");
        fs::create_dir_all(&screenshots_dir).map_err(|e| {
            AppError::persistence(format!(
                "cannot create {}: {}",
                screenshots_dir.display(),
                e
            ))
        })?;
        Ok(Self { screenshots_dir })
    }

    pub fn screenshots_dir(&self) -> &Path {
        &self.screenshots_dir
    }

    /// Writes the capture keyed by the current timestamp.
    ///
    /// On a write error the partial file is removed before the error is
    /// returned; a failed save leaves zero files behind.
    pub fn save_capture(&self, image: &CapturedImage) -> Result<SavedCapture> {
        let timestamp = Utc::now();
        let base_name = format!("capture-{}", filesystem_timestamp(timestamp));
        let png_path = self.screenshots_dir.join(format!("{}.png", base_name));

        if let Err(e) = fs::write(&png_path, &image.data) {
            remove_quietly(&png_path);
            return Err(AppError::persistence(format!(
                "cannot write {}: {}",
                png_path.display(),
                e
            )));
        }

        debug!(path = %png_path.display(), width = image.width, height = image.height, "capture persisted");
        Ok(SavedCapture {
            base_name,
            png_path,
            timestamp,
        })
    }

    /// Writes the prompt text next to the capture, same base name.
    ///
    /// The caller is expected to [`discard`](Self::discard) the whole
    /// artifact if this fails; a half-persisted capture must not be routed.
    pub fn save_prompt(&self, capture: &SavedCapture, text: &str) -> Result<PathBuf> {
        let path = capture.txt_path();
        if let Err(e) = fs::write(&path, text) {
            remove_quietly(&path);
            return Err(AppError::persistence(format!(
                "cannot write {}: {}",
                path.display(),
                e
            )));
        }
        Ok(path)
    }

    /// Best-effort removal of everything persisted for this capture.
    pub fn discard(&self, capture: &SavedCapture) {
        remove_quietly(&capture.png_path);
        remove_quietly(&capture.txt_path());
    }
}

/// ISO 8601 with `:` and `.` replaced so the string is a valid file name on
/// every platform.
fn filesystem_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

fn remove_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), "failed to remove partial file: {}", e),
    }
}
