//! Overlay windows: the selection surface and the state machine that owns it.
//!
//! Submodules:
//! - [`controller`]: the [`OverlayController`] state machine; the only place
//!   window visibility is decided.
//! - [`surface`]: the egui full-screen selection overlay.
//! - [`draw`]: painting helpers for the overlay.
//!
//! The split matters: the controller is pure coordination (and carries the
//! restore-on-every-path invariant tests), while the surface is the one
//! eframe-specific piece and stays dumb.

mod controller;
mod draw;
mod surface;

pub use controller::{
    OverlayController, OverlaySurfaces, SessionListener, SessionOutcome, WindowState,
};
pub use surface::{run_selection_overlay, RegionChoice};
