//! Screen capture backends.
//!
//! Three incompatible native capture paths hide behind one trait:
//!
//! - [`ThumbnailBackend`]: whole-screen thumbnail requested at explicit
//!   native size, cropped in-process.
//! - [`NativeMonitorBackend`]: direct full-frame monitor capture, cropped
//!   in-process.
//! - [`PipelineBackend`]: out-of-process capture utility piped through
//!   crop, optional sharpening, and PNG compression.
//!
//! The backend is selected once at startup via [`BackendKind`] and handed to
//! the orchestrator as a trait object; callers never branch on the kind.
//! All three yield pixel-identical crops for the same nominal selection on
//! the same display, within encoding tolerance.

mod monitor;
mod pipeline;
mod thumbnail;

pub use monitor::NativeMonitorBackend;
pub use pipeline::PipelineBackend;
pub use thumbnail::ThumbnailBackend;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::geometry::{DisplayMetrics, PixelRect};
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use screenshots::Screen;
use std::io::Cursor;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Encoding of a [`CapturedImage`]'s byte buffer. Always lossless.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageEncoding {
    Png,
}

/// A finished capture: encoded pixels at native resolution.
#[derive(Clone, Debug)]
pub struct CapturedImage {
    pub data: Vec<u8>,
    pub encoding: ImageEncoding,
    pub width: u32,
    pub height: u32,
}

impl CapturedImage {
    /// Encodes raw pixels losslessly. This is the compression step every
    /// backend ends with.
    pub fn from_pixels(pixels: &DynamicImage) -> Result<Self> {
        let mut buffer: Vec<u8> = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);
        pixels
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|e| AppError::capture(format!("Failed to encode capture: {}", e)))?;
        Ok(Self {
            data: buffer,
            encoding: ImageEncoding::Png,
            width: pixels.width(),
            height: pixels.height(),
        })
    }

    /// Decodes back into raw pixels. Used by consumers and tests that need
    /// to look at the actual crop.
    pub fn decode(&self) -> Result<DynamicImage> {
        image::load_from_memory_with_format(&self.data, ImageFormat::Png)
            .map_err(|e| AppError::capture(format!("Failed to decode capture: {}", e)))
    }
}

/// Uniform capture operation over the three backend variants.
///
/// Both failure modes are terminal for the current request; backends never
/// retry internally.
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Short name for logs and delivery reports.
    fn name(&self) -> &'static str;

    /// Geometry of the display this backend captures.
    fn display_metrics(&self) -> Result<DisplayMetrics>;

    /// Captures the given native-pixel rect losslessly.
    async fn capture_region(&self, rect: PixelRect) -> Result<CapturedImage>;
}

/// Source of raw frames for the in-process backends.
///
/// Production uses [`PrimaryDisplaySource`]; tests substitute synthetic
/// frames so crops can be verified pixel-for-pixel.
pub trait FrameSource: Send + Sync {
    fn display_metrics(&self) -> Result<DisplayMetrics>;

    /// The full frame at native resolution.
    fn full_frame(&self) -> Result<DynamicImage>;

    /// A whole-screen thumbnail at the requested size.
    fn thumbnail(&self, width: u32, height: u32) -> Result<DynamicImage>;
}

/// Frame source backed by the primary display.
pub struct PrimaryDisplaySource {
    screen: Screen,
}

impl PrimaryDisplaySource {
    /// Probes the primary display.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::CaptureUnavailable`] if screen enumeration fails
    /// (e.g. no display server) or no screens are detected.
    pub fn new() -> Result<Self> {
        let screens = Screen::all()
            .map_err(|e| AppError::unavailable(format!("Failed to enumerate screens: {}", e)))?;
        let screen = screens
            .into_iter()
            .next()
            .ok_or_else(|| AppError::unavailable("No screens detected"))?;
        Ok(Self { screen })
    }

    /// Lists available displays with their dimensions and scale factors.
    pub fn list_displays() -> Result<Vec<String>> {
        let screens = Screen::all()
            .map_err(|e| AppError::unavailable(format!("Failed to enumerate screens: {}", e)))?;
        Ok(screens
            .iter()
            .enumerate()
            .map(|(i, s)| {
                format!(
                    "Display {}: {}x{} (scale: {})",
                    i, s.display_info.width, s.display_info.height, s.display_info.scale_factor
                )
            })
            .collect())
    }

    fn grab(&self) -> Result<DynamicImage> {
        let captured = self
            .screen
            .capture()
            .map_err(|e| AppError::capture(format!("Failed to capture screen: {}", e)))?;
        let width = captured.width();
        let height = captured.height();
        let rgba_data = captured.into_raw();
        let buffer = image::ImageBuffer::from_raw(width, height, rgba_data)
            .ok_or_else(|| AppError::capture("Failed to create image buffer"))?;
        Ok(DynamicImage::ImageRgba8(buffer))
    }
}

impl FrameSource for PrimaryDisplaySource {
    fn display_metrics(&self) -> Result<DisplayMetrics> {
        let info = self.screen.display_info;
        Ok(DisplayMetrics::of_logical(
            info.width as f64,
            info.height as f64,
            info.scale_factor as f64,
        ))
    }

    fn full_frame(&self) -> Result<DynamicImage> {
        self.grab()
    }

    fn thumbnail(&self, width: u32, height: u32) -> Result<DynamicImage> {
        let frame = self.grab()?;
        if frame.width() == width && frame.height() == height {
            return Ok(frame);
        }
        debug!(
            from_width = frame.width(),
            from_height = frame.height(),
            width,
            height,
            "resizing frame to requested thumbnail size"
        );
        Ok(frame.resize_exact(width, height, image::imageops::FilterType::Lanczos3))
    }
}

/// Crops a full frame to the requested rect.
///
/// The rect must already fit inside the frame; the coordinate mapper
/// guarantees that for rects it produced, so an overhang here means the
/// backend delivered a frame at the wrong resolution.
pub(crate) fn crop_frame(frame: &DynamicImage, rect: PixelRect) -> Result<DynamicImage> {
    if rect.x + rect.width > frame.width() || rect.y + rect.height > frame.height() {
        return Err(AppError::capture(format!(
            "crop {}x{} at ({}, {}) exceeds {}x{} frame",
            rect.width,
            rect.height,
            rect.x,
            rect.y,
            frame.width(),
            frame.height()
        )));
    }
    Ok(frame.crop_imm(rect.x, rect.y, rect.width, rect.height))
}

/// Which capture strategy to use. Resolved once at startup from
/// configuration or platform probing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Thumbnail,
    Monitor,
    Pipeline,
}

impl BackendKind {
    /// The default strategy for the current platform: the external capture
    /// utility on macOS (it sees the real screen even when overlay windows
    /// are up), direct monitor capture elsewhere.
    pub fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            Self::Pipeline
        } else {
            Self::Monitor
        }
    }
}

impl FromStr for BackendKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "thumbnail" => Ok(Self::Thumbnail),
            "monitor" => Ok(Self::Monitor),
            "pipeline" => Ok(Self::Pipeline),
            other => Err(AppError::config(format!(
                "unknown capture backend '{}', expected thumbnail, monitor, or pipeline",
                other
            ))),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Thumbnail => write!(f, "thumbnail"),
            Self::Monitor => write!(f, "monitor"),
            Self::Pipeline => write!(f, "pipeline"),
        }
    }
}

/// Materializes the configured backend as a single strategy object.
pub fn build_backend(config: &Config) -> Result<Arc<dyn CaptureBackend>> {
    let backend: Arc<dyn CaptureBackend> = match config.backend {
        BackendKind::Thumbnail => {
            Arc::new(ThumbnailBackend::new(Arc::new(PrimaryDisplaySource::new()?)))
        }
        BackendKind::Monitor => {
            Arc::new(NativeMonitorBackend::new(Arc::new(PrimaryDisplaySource::new()?)))
        }
        BackendKind::Pipeline => {
            let metrics = PrimaryDisplaySource::new()?.display_metrics()?;
            Arc::new(PipelineBackend::from_config(config, metrics))
        }
    };
    debug!(backend = backend.name(), "capture backend selected");
    Ok(backend)
}
