//! Capture orchestration: map → capture → persist → route.
//!
//! The orchestrator is deliberately backend-agnostic: it holds one
//! [`CaptureBackend`] strategy object chosen at startup and never inspects
//! which variant it got. Validation, capture, and persistence failures abort
//! the whole operation early with zero files left behind; routing failures
//! are isolated per sink and only ever show up on the [`DeliveryReport`].

use crate::capture::CaptureBackend;
use crate::error::Result;
use crate::geometry::{to_native_rect, SelectionRect};
use crate::routing::{DeliveryReport, Router, SinkOutcome};
use crate::storage::{ArtifactStore, SavedCapture};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{info, warn};

/// One user action: a selection, an optional prompt, and the sinks to feed.
#[derive(Clone, Debug)]
pub struct CaptureRequest {
    pub selection: SelectionRect,
    pub prompt_text: Option<String>,
    pub destinations: Vec<String>,
}

impl CaptureRequest {
    pub fn new(
        selection: SelectionRect,
        prompt_text: Option<String>,
        destinations: Vec<String>,
    ) -> Self {
        Self {
            selection,
            prompt_text,
            destinations,
        }
    }
}

/// Sequences a capture request through the pipeline.
pub struct CaptureOrchestrator {
    backend: Arc<dyn CaptureBackend>,
    store: ArtifactStore,
    router: Router,
}

impl CaptureOrchestrator {
    pub fn new(backend: Arc<dyn CaptureBackend>, store: ArtifactStore, router: Router) -> Self {
        Self {
            backend,
            store,
            router,
        }
    }

    /// Runs the full pipeline, reporting per-sink outcomes.
    pub async fn execute(&self, request: CaptureRequest) -> Result<DeliveryReport> {
        let (settled, _) = oneshot::channel();
        self.execute_with_signal(request, settled).await
    }

    /// Like [`execute`](Self::execute), but fires `settled` the moment the
    /// capture-and-persist phase concludes, success or failure, and before
    /// any routing happens. The overlay controller restores the main window
    /// on that signal, so routing may still be in flight when the window
    /// reappears.
    pub async fn execute_with_signal(
        &self,
        request: CaptureRequest,
        settled: oneshot::Sender<()>,
    ) -> Result<DeliveryReport> {
        let persisted = self.capture_and_persist(&request).await;
        let _ = settled.send(());
        let capture = persisted?;

        let mut report = DeliveryReport {
            filename: Some(capture.filename()),
            ..Default::default()
        };
        for destination in &request.destinations {
            match self
                .router
                .route(destination, &capture, request.prompt_text.as_deref())
            {
                Ok(()) => report.record(destination, SinkOutcome::Delivered),
                Err(e) => {
                    warn!(sink = %destination, "routing failed: {}", e);
                    report.record(
                        destination,
                        SinkOutcome::Failed {
                            reason: e.to_string(),
                        },
                    );
                }
            }
        }

        info!(
            file = %capture.filename(),
            sinks = request.destinations.len(),
            delivered = report.fully_delivered(),
            "capture routed"
        );
        Ok(report)
    }

    /// The fail-fast half of the pipeline. Any error here leaves zero
    /// persisted files.
    async fn capture_and_persist(&self, request: &CaptureRequest) -> Result<SavedCapture> {
        let metrics = self.backend.display_metrics()?;
        let rect = to_native_rect(request.selection, &metrics)?;

        info!(backend = self.backend.name(), ?rect, "capturing region");
        let image = self.backend.capture_region(rect).await?;

        let capture = self.store.save_capture(&image)?;
        if let Some(text) = &request.prompt_text {
            if let Err(e) = self.store.save_prompt(&capture, text) {
                // Half an artifact must not be routed; take the PNG with us.
                self.store.discard(&capture);
                return Err(e);
            }
        }
        Ok(capture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::testing::{FailingSource, SyntheticSource};
    use crate::error::AppError;
    use crate::capture::NativeMonitorBackend;
    use crate::geometry::{DisplayMetrics, PixelRect};
    use crate::routing::{CommandMailbox, PromptQueue, Router, SINK_COMMAND, SINK_QUEUE};
    use std::fs;
    use std::path::Path;

    fn metrics() -> DisplayMetrics {
        DisplayMetrics::of_logical(1280.0, 720.0, 1.5)
    }

    fn working_backend() -> Arc<dyn CaptureBackend> {
        let source = SyntheticSource::new(metrics()).with_red_region(PixelRect {
            x: 150,
            y: 75,
            width: 450,
            height: 300,
        });
        Arc::new(NativeMonitorBackend::new(Arc::new(source)))
    }

    fn failing_backend() -> Arc<dyn CaptureBackend> {
        Arc::new(NativeMonitorBackend::new(Arc::new(FailingSource)))
    }

    fn orchestrator_in(root: &Path, backend: Arc<dyn CaptureBackend>) -> CaptureOrchestrator {
        CaptureOrchestrator::new(
            backend,
            ArtifactStore::new(root).unwrap(),
            Router::standard(root),
        )
    }

    fn persisted_files(root: &Path) -> Vec<String> {
        let dir = root.join("screenshots");
        if !dir.exists() {
            return Vec::new();
        }
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    fn request(destinations: Vec<String>) -> CaptureRequest {
        CaptureRequest::new(
            SelectionRect::new(100.0, 50.0, 300.0, 200.0),
            Some("explain this".to_string()),
            destinations,
        )
    }

    #[tokio::test]
    async fn persists_image_and_prompt_and_delivers_to_queue() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator_in(dir.path(), working_backend());

        let report = orchestrator
            .execute(request(vec![SINK_QUEUE.to_string()]))
            .await
            .unwrap();

        assert!(report.delivered_to(SINK_QUEUE));
        let files = persisted_files(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|f| f.ends_with(".png")));
        assert!(files.iter().any(|f| f.ends_with(".txt")));

        let item = PromptQueue::new(dir.path().join(".prompt_queue.json"))
            .dequeue()
            .unwrap()
            .unwrap();
        assert_eq!(item.prompt, "explain this");
        assert_eq!(item.filename.as_deref(), report.filename.as_deref());
    }

    #[tokio::test]
    async fn invalid_selection_aborts_with_zero_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator_in(dir.path(), working_backend());

        let (settled_tx, settled_rx) = oneshot::channel();
        let result = orchestrator
            .execute_with_signal(
                CaptureRequest::new(
                    SelectionRect::new(5000.0, 5000.0, 10.0, 10.0),
                    None,
                    vec![SINK_QUEUE.to_string()],
                ),
                settled_tx,
            )
            .await;

        assert!(matches!(result, Err(AppError::InvalidSelection(_))));
        // The settle signal fires on failures too; the window must come back.
        settled_rx.await.unwrap();
        assert!(persisted_files(dir.path()).is_empty());
        assert!(!dir.path().join(".prompt_queue.json").exists());
    }

    #[tokio::test]
    async fn capture_failure_aborts_before_any_file_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator_in(dir.path(), failing_backend());

        let result = orchestrator
            .execute(request(vec![SINK_QUEUE.to_string()]))
            .await;

        assert!(matches!(result, Err(AppError::CaptureFailed(_))));
        assert!(persisted_files(dir.path()).is_empty());
        assert!(!dir.path().join(".prompt_queue.json").exists());
    }

    #[tokio::test]
    async fn persistence_failure_is_fatal_and_routing_never_happens() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        // Sabotage the screenshots directory after the store opened it.
        fs::remove_dir(store.screenshots_dir()).unwrap();
        fs::write(store.screenshots_dir(), b"not a dir").unwrap();

        let orchestrator =
            CaptureOrchestrator::new(working_backend(), store, Router::standard(dir.path()));
        let result = orchestrator
            .execute(request(vec![SINK_QUEUE.to_string()]))
            .await;

        assert!(matches!(result, Err(AppError::PersistenceFailed(_))));
        assert!(!dir.path().join(".prompt_queue.json").exists());
    }

    #[tokio::test]
    async fn sink_failures_are_isolated_per_sink() {
        let dir = tempfile::tempdir().unwrap();
        let mut router = Router::new();
        router.add_pull(
            SINK_QUEUE,
            PromptQueue::new(dir.path().join(".prompt_queue.json")),
        );
        // Mailbox under a directory that does not exist: push delivery fails.
        router.add_push(
            SINK_COMMAND,
            CommandMailbox::new(dir.path().join("missing").join(".command")),
        );

        let orchestrator = CaptureOrchestrator::new(
            working_backend(),
            ArtifactStore::new(dir.path()).unwrap(),
            router,
        );
        let report = orchestrator
            .execute(request(vec![
                SINK_COMMAND.to_string(),
                SINK_QUEUE.to_string(),
            ]))
            .await
            .unwrap();

        assert!(!report.delivered_to(SINK_COMMAND));
        assert!(report.delivered_to(SINK_QUEUE));
        assert!(!report.fully_delivered());

        // The pull item landed despite the push failure.
        let queue = PromptQueue::new(dir.path().join(".prompt_queue.json"));
        assert_eq!(queue.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_destination_is_recorded_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator_in(dir.path(), working_backend());

        let report = orchestrator
            .execute(request(vec!["nowhere".to_string(), SINK_QUEUE.to_string()]))
            .await
            .unwrap();

        assert!(!report.delivered_to("nowhere"));
        assert!(report.delivered_to(SINK_QUEUE));
    }

    #[tokio::test]
    async fn settles_before_routing_outcome_is_known() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator_in(dir.path(), working_backend());

        let (settled_tx, settled_rx) = oneshot::channel();
        let report = orchestrator
            .execute_with_signal(request(vec![SINK_QUEUE.to_string()]), settled_tx)
            .await
            .unwrap();

        // By the time execute returns, the settle signal must have fired.
        settled_rx.await.unwrap();
        assert!(report.delivered_to(SINK_QUEUE));
    }
}
