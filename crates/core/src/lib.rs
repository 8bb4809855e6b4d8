//! ShotPipe Core Library
//!
//! This library implements the capture-and-route pipeline for a desktop AI
//! assistant: a user-drawn screen selection becomes a native-resolution
//! lossless crop, is persisted to disk, and is fanned out through
//! file-based queues to asynchronous consumers.
//!
//! # Overview
//!
//! - **Coordinate mapping**: logical selection → native pixel rect via
//!   [`geometry`]
//! - **Capture**: three interchangeable backends behind one trait via
//!   [`capture`]
//! - **Persistence**: timestamped artifacts via [`storage`]
//! - **Fan-out**: push mailbox and durable pull queue via [`routing`]
//! - **Coordination**: the overlay window state machine via [`overlay`],
//!   sequenced by the [`orchestrator`]
//!
//! # Quick Start
//!
//! The [`ShotPipe`] facade wires the subsystems from configuration:
//!
//! ```ignore
//! use shotpipe_core::{ShotPipe, SelectionRect};
//!
//! let app = ShotPipe::new()?;
//!
//! // Headless: capture a region and fan it out to the standard sinks.
//! let report = app
//!     .capture_and_route(
//!         SelectionRect::new(100.0, 50.0, 300.0, 200.0),
//!         Some("Explain this code".to_string()),
//!         vec!["queue".to_string()],
//!     )
//!     .await?;
//! println!("delivered: {}", report.fully_delivered());
//! ```

pub mod capture;
pub mod config;
pub mod error;
pub mod geometry;
pub mod orchestrator;
pub mod overlay;
pub mod routing;
pub mod storage;

// Re-export primary types for convenience
pub use capture::{build_backend, BackendKind, CaptureBackend, CapturedImage};
pub use config::Config;
pub use error::{AppError, Result};
pub use geometry::{to_native_rect, DisplayMetrics, PixelRect, SelectionRect};
pub use orchestrator::{CaptureOrchestrator, CaptureRequest};
pub use overlay::{OverlayController, OverlaySurfaces, SessionOutcome, WindowState};
pub use routing::{CommandMailbox, DeliveryReport, PromptQueue, Router};

use crate::storage::ArtifactStore;
use std::sync::Arc;

/// Main entry point for the shotpipe pipeline.
///
/// Wires configuration → backend → store → router → orchestrator and hands
/// out controller and consumer handles. This is the recommended way to use
/// the library.
pub struct ShotPipe {
    config: Config,
    backend: Arc<dyn CaptureBackend>,
    orchestrator: Arc<CaptureOrchestrator>,
}

impl ShotPipe {
    /// Creates an instance from environment configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid, the capture backend
    /// cannot be probed, or the storage root cannot be created.
    pub fn new() -> Result<Self> {
        let config = Config::load()?;
        Self::with_config(config)
    }

    /// Creates an instance with a pre-built configuration.
    pub fn with_config(config: Config) -> Result<Self> {
        let backend = build_backend(&config)?;
        let store = ArtifactStore::new(&config.root_dir)?;
        let router = Router::standard(&config.root_dir);
        let orchestrator = Arc::new(CaptureOrchestrator::new(backend.clone(), store, router));
        Ok(Self {
            config,
            backend,
            orchestrator,
        })
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Geometry of the display the configured backend captures.
    pub fn display_metrics(&self) -> Result<DisplayMetrics> {
        self.backend.display_metrics()
    }

    /// Builds the overlay controller over the given window surfaces.
    ///
    /// The controller (not the caller) owns window visibility from here on.
    pub fn controller(&self, surfaces: Arc<dyn OverlaySurfaces>) -> OverlayController {
        OverlayController::new(surfaces, self.orchestrator.clone())
    }

    /// Captures a region and routes it without any overlay involvement.
    ///
    /// Useful for scripted captures and for collaborators that bring their
    /// own selection UI.
    pub async fn capture_and_route(
        &self,
        selection: SelectionRect,
        prompt: Option<String>,
        destinations: Vec<String>,
    ) -> Result<DeliveryReport> {
        self.orchestrator
            .execute(CaptureRequest::new(selection, prompt, destinations))
            .await
    }

    /// Consumer-side handle on the standard queue file.
    pub fn queue(&self) -> PromptQueue {
        Router::standard_queue(&self.config.root_dir)
    }

    /// Consumer-side handle on the standard mailbox file.
    pub fn mailbox(&self) -> CommandMailbox {
        Router::standard_mailbox(&self.config.root_dir)
    }
}

/// Initializes the library by loading environment variables.
///
/// Call this once at application startup before using any other functions.
pub fn init() {
    let _ = dotenvy::dotenv();
}
