//! Selection geometry and coordinate mapping.
//!
//! The overlay surface reports selections in logical pixels (UI coordinates,
//! independent of display DPI scaling) while capture backends want native
//! device pixels. [`to_native_rect`] is the single place that conversion
//! happens; no backend-specific rounding is allowed to leak in anywhere else.

use crate::error::{AppError, Result};

/// A user-drawn selection in logical pixels.
///
/// May be partially or fully outside the display; [`to_native_rect`] clamps
/// before scaling and rejects selections with no visible area.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectionRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl SelectionRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// A rectangle in native device pixels, ready to hand to a capture backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Geometry of a single display.
///
/// `scale_factor` may be fractional (1.0, 1.25, 1.5, 2.0…); the native size
/// is always `round(logical × scale_factor)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayMetrics {
    pub logical_width: f64,
    pub logical_height: f64,
    pub native_width: u32,
    pub native_height: u32,
    pub scale_factor: f64,
}

impl DisplayMetrics {
    /// Builds metrics from a logical size and scale factor, deriving the
    /// native size.
    pub fn of_logical(logical_width: f64, logical_height: f64, scale_factor: f64) -> Self {
        Self {
            logical_width,
            logical_height,
            native_width: (logical_width * scale_factor).round() as u32,
            native_height: (logical_height * scale_factor).round() as u32,
            scale_factor,
        }
    }
}

/// Maps a logical selection onto the display's native pixel grid.
///
/// The selection is clamped to `[0, logical_width] × [0, logical_height]`
/// first; a clamped width or height of zero (selection fully off-screen or
/// degenerate) is rejected with [`AppError::InvalidSelection`]. Each element
/// of the clamped rect is then scaled by `scale_factor` and rounded, and the
/// result is fitted inside the native frame, since element-wise rounding can
/// overshoot the frame edge by one pixel.
///
/// Pure and idempotent: identical inputs always yield identical output.
pub fn to_native_rect(selection: SelectionRect, metrics: &DisplayMetrics) -> Result<PixelRect> {
    let left = selection.x.clamp(0.0, metrics.logical_width);
    let top = selection.y.clamp(0.0, metrics.logical_height);
    let right = (selection.x + selection.width).clamp(0.0, metrics.logical_width);
    let bottom = (selection.y + selection.height).clamp(0.0, metrics.logical_height);

    let width = right - left;
    let height = bottom - top;
    if width <= 0.0 || height <= 0.0 {
        return Err(AppError::selection(format!(
            "selection {:.0}x{:.0} at ({:.0}, {:.0}) has no visible area",
            selection.width, selection.height, selection.x, selection.y
        )));
    }

    let scale = metrics.scale_factor;
    let x = (left * scale).round() as u32;
    let y = (top * scale).round() as u32;
    let mut w = (width * scale).round() as u32;
    let mut h = (height * scale).round() as u32;

    // Element-wise rounding may push the far edge one pixel past the frame.
    w = w.min(metrics.native_width.saturating_sub(x));
    h = h.min(metrics.native_height.saturating_sub(y));
    if w == 0 || h == 0 {
        return Err(AppError::selection(
            "selection rounds to an empty native rect",
        ));
    }

    Ok(PixelRect {
        x,
        y,
        width: w,
        height: h,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(scale: f64) -> DisplayMetrics {
        DisplayMetrics::of_logical(1920.0, 1080.0, scale)
    }

    #[test]
    fn maps_elementwise_for_common_scale_factors() {
        let rect = SelectionRect::new(100.0, 50.0, 300.0, 200.0);
        for scale in [1.0, 1.25, 1.5, 2.0] {
            let mapped = to_native_rect(rect, &metrics(scale)).unwrap();
            assert_eq!(mapped.x, (100.0 * scale).round() as u32);
            assert_eq!(mapped.y, (50.0 * scale).round() as u32);
            assert_eq!(mapped.width, (300.0 * scale).round() as u32);
            assert_eq!(mapped.height, (200.0 * scale).round() as u32);
        }
    }

    #[test]
    fn hidpi_selection_maps_to_expected_pixels() {
        let mapped = to_native_rect(SelectionRect::new(100.0, 50.0, 300.0, 200.0), &metrics(1.5))
            .unwrap();
        assert_eq!(
            mapped,
            PixelRect {
                x: 150,
                y: 75,
                width: 450,
                height: 300
            }
        );
    }

    #[test]
    fn is_idempotent_under_repeated_application() {
        let rect = SelectionRect::new(13.3, 7.7, 512.9, 301.4);
        let m = metrics(1.25);
        let first = to_native_rect(rect, &m).unwrap();
        let second = to_native_rect(rect, &m).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn clamps_partially_out_of_bounds_before_scaling() {
        // Sticks out past the left and top edges; only the on-screen part counts.
        let mapped =
            to_native_rect(SelectionRect::new(-50.0, -20.0, 150.0, 120.0), &metrics(2.0)).unwrap();
        assert_eq!(
            mapped,
            PixelRect {
                x: 0,
                y: 0,
                width: 200,
                height: 200
            }
        );

        // Sticks out past the right edge.
        let mapped =
            to_native_rect(SelectionRect::new(1900.0, 0.0, 100.0, 100.0), &metrics(1.0)).unwrap();
        assert_eq!(mapped.width, 20);
    }

    #[test]
    fn rejects_fully_out_of_bounds() {
        assert!(matches!(
            to_native_rect(SelectionRect::new(2000.0, 0.0, 100.0, 100.0), &metrics(1.0)),
            Err(AppError::InvalidSelection(_))
        ));
        assert!(matches!(
            to_native_rect(
                SelectionRect::new(-200.0, -200.0, 100.0, 100.0),
                &metrics(1.0)
            ),
            Err(AppError::InvalidSelection(_))
        ));
    }

    #[test]
    fn rejects_non_positive_size() {
        assert!(matches!(
            to_native_rect(SelectionRect::new(10.0, 10.0, 0.0, 50.0), &metrics(1.0)),
            Err(AppError::InvalidSelection(_))
        ));
        assert!(matches!(
            to_native_rect(SelectionRect::new(10.0, 10.0, 50.0, -5.0), &metrics(1.5)),
            Err(AppError::InvalidSelection(_))
        ));
    }

    #[test]
    fn fits_rounded_rect_inside_native_frame() {
        // 1366x768 at 1.25 has a fractional native edge; the mapped rect must
        // never overhang the frame.
        let m = DisplayMetrics::of_logical(1366.0, 768.0, 1.25);
        let mapped = to_native_rect(SelectionRect::new(0.3, 0.3, 1365.7, 767.7), &m).unwrap();
        assert!(mapped.x + mapped.width <= m.native_width);
        assert!(mapped.y + mapped.height <= m.native_height);
    }

    #[test]
    fn native_size_follows_scale_invariant() {
        let m = DisplayMetrics::of_logical(1536.0, 864.0, 1.25);
        assert_eq!(m.native_width, 1920);
        assert_eq!(m.native_height, 1080);
    }
}
