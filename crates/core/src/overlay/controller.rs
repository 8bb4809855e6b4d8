//! Overlay window state machine.
//!
//! The controller is the only owner of window handles; everything else asks
//! for named transitions (`start_capture`, `confirm_selection`, `cancel`)
//! and never touches a surface directly. The one behavior that must never
//! regress: the main surface is visible again on every exit path, whether
//! that is success, backend failure, persistence failure, or cancel.

use crate::error::{AppError, Result};
use crate::geometry::SelectionRect;
use crate::orchestrator::{CaptureOrchestrator, CaptureRequest};
use crate::routing::DeliveryReport;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Which surface the user is looking at.
///
/// Exactly one of `MainVisible` / `SelectionActive` holds outside a brief
/// `Transitioning` window between selection teardown and main restore.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowState {
    MainVisible,
    SelectionActive,
    Transitioning,
}

/// Final word on a capture session, delivered to the listener registered at
/// `start_capture`.
///
/// Cancellation is an explicit payload: a caller awaiting a session result
/// always gets an answer, never a silently-dropped channel.
#[derive(Debug)]
pub enum SessionOutcome {
    Delivered(DeliveryReport),
    Cancelled,
    Failed(AppError),
}

/// Receives the [`SessionOutcome`] for one capture session.
pub type SessionListener = oneshot::Receiver<SessionOutcome>;

/// Window operations the controller drives.
///
/// Implementations must not call back into the controller; these are plain
/// visibility switches.
pub trait OverlaySurfaces: Send + Sync + 'static {
    fn hide_main(&self);
    fn show_main(&self);
    fn open_selection(&self) -> Result<()>;
    fn close_selection(&self);
}

struct Inner {
    state: WindowState,
    pending: Option<oneshot::Sender<SessionOutcome>>,
}

/// Owns the overlay windows and sequences capture sessions through them.
#[derive(Clone)]
pub struct OverlayController {
    surfaces: Arc<dyn OverlaySurfaces>,
    orchestrator: Arc<CaptureOrchestrator>,
    inner: Arc<Mutex<Inner>>,
}

impl OverlayController {
    pub fn new(surfaces: Arc<dyn OverlaySurfaces>, orchestrator: Arc<CaptureOrchestrator>) -> Self {
        Self {
            surfaces,
            orchestrator,
            inner: Arc::new(Mutex::new(Inner {
                state: WindowState::MainVisible,
                pending: None,
            })),
        }
    }

    pub fn state(&self) -> WindowState {
        self.lock().state
    }

    /// Hides the main surface and opens the selection surface.
    ///
    /// Returns `Ok(None)` when a session is already active (reentrancy
    /// guard: a second hotkey press while selecting is a no-op). On a
    /// surface failure the main window is re-shown before the error is
    /// returned.
    pub fn start_capture(&self) -> Result<Option<SessionListener>> {
        let mut inner = self.lock();
        if inner.state != WindowState::MainVisible {
            debug!(state = ?inner.state, "capture session already active, ignoring");
            return Ok(None);
        }

        self.surfaces.hide_main();
        if let Err(e) = self.surfaces.open_selection() {
            self.surfaces.show_main();
            return Err(e);
        }

        inner.state = WindowState::SelectionActive;
        let (tx, rx) = oneshot::channel();
        inner.pending = Some(tx);
        info!("selection surface active");
        Ok(Some(rx))
    }

    /// The user confirmed a selection: tear down the selection surface and
    /// hand the request to the orchestrator.
    ///
    /// The main surface comes back as soon as the capture-and-persist phase
    /// settles (success or failure); routing may still be in flight at that
    /// point. The session listener resolves once the delivery report (or
    /// error) is known.
    pub fn confirm_selection(
        &self,
        selection: SelectionRect,
        prompt: Option<String>,
        destinations: Vec<String>,
    ) {
        let pending = {
            let mut inner = self.lock();
            if inner.state != WindowState::SelectionActive {
                warn!(state = ?inner.state, "confirm without an active selection, ignoring");
                return;
            }
            self.surfaces.close_selection();
            inner.state = WindowState::Transitioning;
            inner.pending.take()
        };

        let (settled_tx, settled_rx) = oneshot::channel();
        let orchestrator = self.orchestrator.clone();
        let request = CaptureRequest::new(selection, prompt, destinations);
        let execution =
            tokio::spawn(async move { orchestrator.execute_with_signal(request, settled_tx).await });

        let surfaces = self.surfaces.clone();
        let inner = self.inner.clone();
        tokio::spawn(async move {
            // The signal arrives when capture settles; if the task died
            // before sending, the dropped sender resolves us just the same.
            let _ = settled_rx.await;
            surfaces.show_main();
            lock_inner(&inner).state = WindowState::MainVisible;

            let outcome = match execution.await {
                Ok(Ok(report)) => SessionOutcome::Delivered(report),
                Ok(Err(err)) => SessionOutcome::Failed(err),
                Err(e) => SessionOutcome::Failed(AppError::ui(format!(
                    "capture task aborted: {}",
                    e
                ))),
            };
            if let Some(tx) = pending {
                let _ = tx.send(outcome);
            }
        });
    }

    /// The user backed out: straight back to the main surface, nothing
    /// captured, nothing persisted.
    ///
    /// Only effective while the selection surface is up; once capture is in
    /// flight the operation runs to completion.
    pub fn cancel(&self) {
        let mut inner = self.lock();
        if inner.state != WindowState::SelectionActive {
            return;
        }
        self.surfaces.close_selection();
        self.surfaces.show_main();
        inner.state = WindowState::MainVisible;
        if let Some(tx) = inner.pending.take() {
            let _ = tx.send(SessionOutcome::Cancelled);
        }
        info!("capture session cancelled");
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        lock_inner(&self.inner)
    }
}

fn lock_inner(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
