//! Window-system thumbnail capture.

use super::{crop_frame, CaptureBackend, CapturedImage, FrameSource};
use crate::error::{AppError, Result};
use crate::geometry::{DisplayMetrics, PixelRect};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::trace;

/// Captures by requesting a whole-screen thumbnail and cropping in-process.
///
/// The thumbnail MUST be requested at explicit native size: window-system
/// thumbnail APIs default to a small preview size and will silently hand
/// back an upscaling-blurred crop otherwise. A source that ignores the
/// requested size is treated as a failed capture rather than a quality loss.
pub struct ThumbnailBackend {
    source: Arc<dyn FrameSource>,
}

impl ThumbnailBackend {
    pub fn new(source: Arc<dyn FrameSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl CaptureBackend for ThumbnailBackend {
    fn name(&self) -> &'static str {
        "thumbnail"
    }

    fn display_metrics(&self) -> Result<DisplayMetrics> {
        self.source.display_metrics()
    }

    async fn capture_region(&self, rect: PixelRect) -> Result<CapturedImage> {
        let metrics = self.source.display_metrics()?;
        let frame = self
            .source
            .thumbnail(metrics.native_width, metrics.native_height)?;
        if frame.width() != metrics.native_width || frame.height() != metrics.native_height {
            return Err(AppError::capture(format!(
                "thumbnail source returned {}x{} for a {}x{} request",
                frame.width(),
                frame.height(),
                metrics.native_width,
                metrics.native_height
            )));
        }
        trace!(?rect, "cropping native-size thumbnail");
        let cropped = crop_frame(&frame, rect)?;
        CapturedImage::from_pixels(&cropped)
    }
}
