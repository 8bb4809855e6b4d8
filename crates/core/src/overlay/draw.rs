//! Painting helpers for the selection surface.

use eframe::egui;

/// Darkens everything outside the selection, leaving the selected region at
/// full brightness. Painted as four rects around the hole.
pub fn dim_around_selection(
    painter: &egui::Painter,
    screen: egui::Rect,
    hole: egui::Rect,
    alpha: u8,
) {
    let shade = egui::Color32::from_black_alpha(alpha);

    let bands = [
        // Above
        egui::Rect::from_min_max(screen.min, egui::pos2(screen.max.x, hole.min.y)),
        // Below
        egui::Rect::from_min_max(egui::pos2(screen.min.x, hole.max.y), screen.max),
        // Left
        egui::Rect::from_min_max(
            egui::pos2(screen.min.x, hole.min.y),
            egui::pos2(hole.min.x, hole.max.y),
        ),
        // Right
        egui::Rect::from_min_max(
            egui::pos2(hole.max.x, hole.min.y),
            egui::pos2(screen.max.x, hole.max.y),
        ),
    ];
    for band in bands {
        painter.rect_filled(band, 0.0, shade);
    }
}

/// Outlines the selection.
pub fn selection_border(painter: &egui::Painter, selection: egui::Rect) {
    painter.rect_stroke(
        selection,
        0.0,
        egui::Stroke::new(2.0, egui::Color32::WHITE),
        egui::StrokeKind::Middle,
    );
}

/// Where to anchor the prompt popup: just below the selection, or above it
/// when the selection hugs the bottom edge.
pub fn prompt_anchor(selection: egui::Rect, screen: egui::Rect, spacing: f32) -> (egui::Pos2, egui::Align2) {
    let x = selection.min.x.clamp(spacing, (screen.max.x - spacing).max(spacing));
    if screen.max.y - selection.max.y > 120.0 {
        (egui::pos2(x, selection.max.y + spacing), egui::Align2::LEFT_TOP)
    } else {
        (egui::pos2(x, selection.min.y - spacing), egui::Align2::LEFT_BOTTOM)
    }
}
