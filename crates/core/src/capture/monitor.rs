//! Direct native monitor capture.

use super::{crop_frame, CaptureBackend, CapturedImage, FrameSource};
use crate::error::{AppError, Result};
use crate::geometry::{DisplayMetrics, PixelRect};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::trace;

/// Captures via the low-level monitor-capture primitive, which returns the
/// full native frame synchronously, then crops in-process.
pub struct NativeMonitorBackend {
    source: Arc<dyn FrameSource>,
}

impl NativeMonitorBackend {
    pub fn new(source: Arc<dyn FrameSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl CaptureBackend for NativeMonitorBackend {
    fn name(&self) -> &'static str {
        "monitor"
    }

    fn display_metrics(&self) -> Result<DisplayMetrics> {
        self.source.display_metrics()
    }

    async fn capture_region(&self, rect: PixelRect) -> Result<CapturedImage> {
        let metrics = self.source.display_metrics()?;
        let frame = self.source.full_frame()?;
        if frame.width() != metrics.native_width || frame.height() != metrics.native_height {
            return Err(AppError::capture(format!(
                "monitor frame is {}x{}, expected native {}x{}",
                frame.width(),
                frame.height(),
                metrics.native_width,
                metrics.native_height
            )));
        }
        trace!(?rect, "cropping native monitor frame");
        let cropped = crop_frame(&frame, rect)?;
        CapturedImage::from_pixels(&cropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::testing::{count_pixels, FailingSource, SyntheticSource};
    use crate::geometry::{to_native_rect, DisplayMetrics, SelectionRect};

    #[tokio::test]
    async fn mapped_selection_crops_exactly_the_red_region() {
        // Logical {100,50,300,200} at scale 1.5 maps to {150,75,450,300};
        // a 1920x1080 frame that is red exactly there must come back as a
        // 450x300 all-red image.
        let metrics = DisplayMetrics::of_logical(1280.0, 720.0, 1.5);
        let rect = to_native_rect(SelectionRect::new(100.0, 50.0, 300.0, 200.0), &metrics).unwrap();
        assert_eq!(
            rect,
            PixelRect {
                x: 150,
                y: 75,
                width: 450,
                height: 300
            }
        );

        let source = SyntheticSource::new(metrics).with_red_region(rect);
        let backend = NativeMonitorBackend::new(Arc::new(source));

        let captured = backend.capture_region(rect).await.unwrap();
        assert_eq!((captured.width, captured.height), (450, 300));
        let decoded = captured.decode().unwrap();
        assert_eq!(
            count_pixels(&decoded, [255, 0, 0, 255]),
            (450 * 300) as usize
        );
    }

    #[tokio::test]
    async fn propagates_primitive_failure() {
        let backend = NativeMonitorBackend::new(Arc::new(FailingSource));
        let result = backend
            .capture_region(PixelRect {
                x: 0,
                y: 0,
                width: 1,
                height: 1,
            })
            .await;
        assert!(matches!(result, Err(AppError::CaptureFailed(_))));
    }
}
