//! End-to-end pipeline tests over a synthetic display.
//!
//! These exercise the public API the way the binary does: build a backend,
//! wire the orchestrator, run a request, then play the consumer side by
//! reading the files another process would read.

use image::{DynamicImage, Rgba, RgbaImage};
use shotpipe_core::capture::{FrameSource, NativeMonitorBackend};
use shotpipe_core::orchestrator::{CaptureOrchestrator, CaptureRequest};
use shotpipe_core::routing::{CommandMailbox, PromptQueue, Router, SINK_COMMAND, SINK_QUEUE};
use shotpipe_core::storage::ArtifactStore;
use shotpipe_core::{DisplayMetrics, PixelRect, Result, SelectionRect};
use std::path::Path;
use std::sync::Arc;

/// A 1280x720 logical display at 1.5x: native 1920x1080, solid white with a
/// red region exactly where the sample selection's mapped rect lands.
struct SyntheticDisplay {
    metrics: DisplayMetrics,
    red: PixelRect,
}

impl SyntheticDisplay {
    fn new() -> Self {
        Self {
            metrics: DisplayMetrics::of_logical(1280.0, 720.0, 1.5),
            red: PixelRect {
                x: 150,
                y: 75,
                width: 450,
                height: 300,
            },
        }
    }
}

impl FrameSource for SyntheticDisplay {
    fn display_metrics(&self) -> Result<DisplayMetrics> {
        Ok(self.metrics)
    }

    fn full_frame(&self) -> Result<DynamicImage> {
        let mut img = RgbaImage::from_pixel(
            self.metrics.native_width,
            self.metrics.native_height,
            Rgba([255, 255, 255, 255]),
        );
        for y in self.red.y..self.red.y + self.red.height {
            for x in self.red.x..self.red.x + self.red.width {
                img.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            }
        }
        Ok(DynamicImage::ImageRgba8(img))
    }

    fn thumbnail(&self, width: u32, height: u32) -> Result<DynamicImage> {
        let frame = self.full_frame()?;
        Ok(frame.resize_exact(width, height, image::imageops::FilterType::Lanczos3))
    }
}

fn orchestrator(root: &Path) -> CaptureOrchestrator {
    let backend = Arc::new(NativeMonitorBackend::new(Arc::new(SyntheticDisplay::new())));
    CaptureOrchestrator::new(
        backend,
        ArtifactStore::new(root).unwrap(),
        Router::standard(root),
    )
}

fn sample_request(destinations: Vec<String>) -> CaptureRequest {
    CaptureRequest::new(
        SelectionRect::new(100.0, 50.0, 300.0, 200.0),
        Some("explain the highlighted code".to_string()),
        destinations,
    )
}

#[tokio::test]
async fn mapped_capture_is_the_exact_red_region() {
    let dir = tempfile::tempdir().unwrap();
    let report = orchestrator(dir.path())
        .execute(sample_request(vec![SINK_QUEUE.to_string()]))
        .await
        .unwrap();

    // The consumer reads the artifact by the filename on the queue item.
    let item = Router::standard_queue(dir.path()).dequeue().unwrap().unwrap();
    assert_eq!(item.filename.as_deref(), report.filename.as_deref());

    let png_path = dir
        .path()
        .join("screenshots")
        .join(item.filename.as_deref().unwrap());
    let decoded = image::open(&png_path).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (450, 300));

    let all_red = decoded
        .to_rgba8()
        .pixels()
        .all(|p| p.0 == [255, 0, 0, 255]);
    assert!(all_red, "crop must contain only the red region");

    // Prompt sidecar shares the base name.
    let txt_path = png_path.with_extension("txt");
    assert_eq!(
        std::fs::read_to_string(txt_path).unwrap(),
        "explain the highlighted code"
    );
}

#[tokio::test]
async fn push_failure_does_not_block_pull_delivery() {
    let dir = tempfile::tempdir().unwrap();

    // The mailbox points into a directory that does not exist: the push
    // consumer is unavailable. The queue is fine.
    let mut router = Router::new();
    router.add_pull(SINK_QUEUE, PromptQueue::new(dir.path().join(".prompt_queue.json")));
    router.add_push(
        SINK_COMMAND,
        CommandMailbox::new(dir.path().join("not-there").join(".command")),
    );
    let backend = Arc::new(NativeMonitorBackend::new(Arc::new(SyntheticDisplay::new())));
    let orchestrator = CaptureOrchestrator::new(
        backend,
        ArtifactStore::new(dir.path()).unwrap(),
        router,
    );

    let report = orchestrator
        .execute(sample_request(vec![
            SINK_COMMAND.to_string(),
            SINK_QUEUE.to_string(),
        ]))
        .await
        .unwrap();

    assert!(!report.delivered_to(SINK_COMMAND));
    assert!(report.delivered_to(SINK_QUEUE));

    // The pull item is present despite the push failure.
    let queue = PromptQueue::new(dir.path().join(".prompt_queue.json"));
    let item = queue.dequeue().unwrap().unwrap();
    assert_eq!(item.prompt, "explain the highlighted code");
}

#[tokio::test]
async fn consumer_drains_mailbox_and_queue_independently() {
    let dir = tempfile::tempdir().unwrap();
    orchestrator(dir.path())
        .execute(sample_request(vec![
            SINK_QUEUE.to_string(),
            SINK_COMMAND.to_string(),
        ]))
        .await
        .unwrap();

    // Mailbox: single JSON object, consumed by take().
    let mailbox = Router::standard_mailbox(dir.path());
    let message = mailbox.take().unwrap().unwrap();
    assert_eq!(message.command, "analyze_screenshot");
    assert!(message.screenshot_path.unwrap().ends_with(".png"));
    assert!(mailbox.take().unwrap().is_none());

    // Queue: FIFO array, consumed by dequeue().
    let queue = Router::standard_queue(dir.path());
    assert!(queue.dequeue().unwrap().is_some());
    assert!(queue.dequeue().unwrap().is_none());
}

#[tokio::test]
async fn failed_capture_routes_nothing() {
    struct DeadDisplay;

    impl FrameSource for DeadDisplay {
        fn display_metrics(&self) -> Result<DisplayMetrics> {
            Ok(DisplayMetrics::of_logical(1280.0, 720.0, 1.5))
        }

        fn full_frame(&self) -> Result<DynamicImage> {
            Err(shotpipe_core::AppError::capture("display went away"))
        }

        fn thumbnail(&self, _w: u32, _h: u32) -> Result<DynamicImage> {
            Err(shotpipe_core::AppError::capture("display went away"))
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(NativeMonitorBackend::new(Arc::new(DeadDisplay)));
    let orchestrator = CaptureOrchestrator::new(
        backend,
        ArtifactStore::new(dir.path()).unwrap(),
        Router::standard(dir.path()),
    );

    let result = orchestrator
        .execute(sample_request(vec![SINK_QUEUE.to_string()]))
        .await;
    assert!(result.is_err());

    assert_eq!(
        std::fs::read_dir(dir.path().join("screenshots")).unwrap().count(),
        0
    );
    assert!(!dir.path().join(".prompt_queue.json").exists());
    assert!(!dir.path().join(".command").exists());
}
