//! Full-screen selection surface.
//!
//! A borderless, always-on-top overlay showing the current screen as a
//! frozen backdrop. The user drags out a region, optionally types a prompt,
//! and confirms; Escape backs out. The surface itself never talks to the
//! capture pipeline; it only produces a [`RegionChoice`] (or nothing, on
//! cancel) for the controller to act on.

use super::draw::{dim_around_selection, prompt_anchor, selection_border};
use crate::error::{AppError, Result};
use crate::geometry::SelectionRect;
use eframe::egui;
use image::DynamicImage;
use std::sync::{Arc, Mutex};

/// Drags shorter than this are accidental clicks, not selections.
const MIN_DRAG_DISTANCE: f32 = 10.0;

const DIM_ALPHA: u8 = 150;

/// What the user picked on the selection surface.
#[derive(Clone, Debug)]
pub struct RegionChoice {
    /// Selected region in logical pixels.
    pub selection: SelectionRect,
    /// Free-text prompt to attach, if any was typed.
    pub prompt: Option<String>,
}

/// Runs the selection overlay until the user confirms or cancels.
///
/// Blocks the calling thread for the lifetime of the overlay window.
/// Returns `Ok(None)` on cancel (Escape or a too-small drag released into
/// nothing): the explicit cancellation signal, never an implicit timeout.
pub fn run_selection_overlay(backdrop: DynamicImage) -> Result<Option<RegionChoice>> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_fullscreen(true)
            .with_decorations(false)
            .with_always_on_top(),
        ..Default::default()
    };

    let choice = Arc::new(Mutex::new(None));
    let surface_choice = choice.clone();

    eframe::run_native(
        "shotpipe selection",
        options,
        Box::new(move |_cc| {
            Ok(Box::new(SelectionSurface::new(backdrop, surface_choice)) as Box<dyn eframe::App>)
        }),
    )
    .map_err(|e| AppError::ui(format!("Failed to run selection surface: {}", e)))?;

    let result = choice
        .lock()
        .map_err(|_| AppError::ui("Failed to read selection result"))?
        .clone();
    Ok(result)
}

struct SelectionSurface {
    // Backdrop state
    texture: Option<egui::TextureHandle>,
    /// Pre-converted pixels; uploading on the first frame keeps the window
    /// open snappy.
    color_image: Option<egui::ColorImage>,

    // Drag state
    drag_start: Option<egui::Pos2>,
    drag_end: Option<egui::Pos2>,
    finalized: bool,

    prompt_input: String,
    choice: Arc<Mutex<Option<RegionChoice>>>,
}

impl SelectionSurface {
    fn new(backdrop: DynamicImage, choice: Arc<Mutex<Option<RegionChoice>>>) -> Self {
        let buffer = backdrop.to_rgba8();
        let size = [backdrop.width() as usize, backdrop.height() as usize];
        let pixels = buffer.as_flat_samples();
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());

        Self {
            texture: None,
            color_image: Some(color_image),
            drag_start: None,
            drag_end: None,
            finalized: false,
            prompt_input: String::new(),
            choice,
        }
    }

    fn track_drag(&mut self, response: &egui::Response) {
        if response.drag_started() {
            self.finalized = false;
            self.prompt_input.clear();
            self.drag_start = response.interact_pointer_pos();
            self.drag_end = response.interact_pointer_pos();
        } else if response.dragged() {
            self.drag_end = response.interact_pointer_pos();
        } else if response.drag_stopped() && !self.finalized {
            match (self.drag_start, self.drag_end) {
                (Some(start), Some(end)) if start.distance(end) > MIN_DRAG_DISTANCE => {
                    self.finalized = true;
                }
                _ => {
                    self.drag_start = None;
                    self.drag_end = None;
                }
            }
        }
    }

    fn selection_rect(&self, ctx: &egui::Context) -> Option<egui::Rect> {
        let start = self.drag_start?;
        let end = if self.finalized {
            self.drag_end?
        } else {
            ctx.pointer_interact_pos().or(self.drag_end)?
        };
        Some(egui::Rect::from_two_pos(start, end))
    }

    fn confirm(&mut self, ctx: &egui::Context, selection: egui::Rect) {
        let prompt = {
            let trimmed = self.prompt_input.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };
        let choice = RegionChoice {
            selection: SelectionRect::new(
                selection.min.x as f64,
                selection.min.y as f64,
                selection.width() as f64,
                selection.height() as f64,
            ),
            prompt,
        };
        if let Ok(mut slot) = self.choice.lock() {
            *slot = Some(choice);
        }
        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
    }

    fn prompt_popup(&mut self, ctx: &egui::Context, selection: egui::Rect, screen: egui::Rect) {
        let (pos, pivot) = prompt_anchor(selection, screen, 10.0);
        let mut confirmed = false;

        egui::Area::new(egui::Id::new("prompt_popup"))
            .fixed_pos(pos)
            .pivot(pivot)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style())
                    .fill(egui::Color32::from_rgb(30, 30, 30))
                    .stroke(egui::Stroke::new(1.0, egui::Color32::GRAY))
                    .inner_margin(10)
                    .show(ui, |ui| {
                        ui.horizontal(|ui| {
                            ui.label("Prompt:");
                            let response = ui.add(
                                egui::TextEdit::singleline(&mut self.prompt_input)
                                    .desired_width(260.0)
                                    .hint_text("e.g. Explain this code")
                                    .lock_focus(true),
                            );
                            response.request_focus();

                            let enter = response.has_focus()
                                && ui.input(|i| i.key_pressed(egui::Key::Enter));
                            if ui.button("Capture").clicked() || enter {
                                confirmed = true;
                            }
                        });
                        ui.label(
                            egui::RichText::new("Enter: capture   Esc: cancel")
                                .small()
                                .color(egui::Color32::GRAY),
                        );
                    });
            });

        if confirmed {
            self.confirm(ctx, selection);
        }
    }
}

impl eframe::App for SelectionSurface {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.set_visuals(egui::Visuals::dark());

        if self.texture.is_none() {
            if let Some(color_image) = self.color_image.take() {
                self.texture =
                    Some(ctx.load_texture("backdrop", color_image, egui::TextureOptions::LINEAR));
            }
        }

        let panel_frame = egui::Frame::default()
            .inner_margin(egui::Margin::same(0))
            .outer_margin(egui::Margin::same(0));

        egui::CentralPanel::default()
            .frame(panel_frame)
            .show(ctx, |ui| {
                let screen = ui.max_rect();

                if let Some(texture) = &self.texture {
                    ui.painter().image(
                        texture.id(),
                        screen,
                        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                        egui::Color32::WHITE,
                    );
                }

                let response = ui.interact(screen, ui.id(), egui::Sense::drag());
                self.track_drag(&response);

                // Escape cancels: the surface closes with no choice recorded.
                if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }

                if let Some(selection) = self.selection_rect(ctx) {
                    dim_around_selection(ui.painter(), screen, selection, DIM_ALPHA);
                    selection_border(ui.painter(), selection);

                    if self.finalized {
                        self.prompt_popup(ctx, selection, screen);
                    }
                }
            });
    }
}
