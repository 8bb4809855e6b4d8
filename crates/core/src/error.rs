//! Error types for the shotpipe-core library.
//!
//! The taxonomy mirrors the pipeline stages: selection validation, capture,
//! persistence, and routing each have their own variant so callers can react
//! precisely (validation and capture errors abort the whole operation early,
//! routing errors are isolated per sink).

use thiserror::Error;

/// Errors that can occur within the shotpipe-core library.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (missing keys, invalid values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The selection is zero-area or fully outside the display bounds.
    /// User-visible no-op: nothing is captured, nothing is persisted.
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    /// The capture backend is missing on this platform or lacks OS permission.
    #[error("Capture backend unavailable: {0}")]
    CaptureUnavailable(String),

    /// The capture backend errored mid-operation.
    #[error("Screen capture failed: {0}")]
    CaptureFailed(String),

    /// Writing the captured artifact (or its prompt sidecar) to disk failed.
    /// Fatal to the whole operation; any partial file has been removed.
    #[error("Failed to persist capture: {0}")]
    PersistenceFailed(String),

    /// Delivery to a single sink failed. Recorded on the delivery report;
    /// never affects other sinks or overall operation success.
    #[error("Routing to sink '{sink}' failed: {reason}")]
    Routing { sink: String, reason: String },

    /// UI-related errors (overlay surface, window management).
    #[error("UI error: {0}")]
    Ui(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an invalid-selection error with the given message.
    pub fn selection(msg: impl Into<String>) -> Self {
        Self::InvalidSelection(msg.into())
    }

    /// Creates a capture-unavailable error with the given message.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::CaptureUnavailable(msg.into())
    }

    /// Creates a capture-failed error with the given message.
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::CaptureFailed(msg.into())
    }

    /// Creates a persistence error with the given message.
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::PersistenceFailed(msg.into())
    }

    /// Creates a per-sink routing error.
    pub fn routing(sink: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Routing {
            sink: sink.into(),
            reason: reason.into(),
        }
    }

    /// Creates a UI error with the given message.
    pub fn ui(msg: impl Into<String>) -> Self {
        Self::Ui(msg.into())
    }
}

/// A convenient alias for Result with [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;
