//! Pure calculation functions for normalization geometry.
//!
//! All functions here are pure and testable without any I/O or images.

use super::orientation::Orientation;
use serde::Serialize;
use thiserror::Error;

/// Draw and canvas dimensions for one normalization.
///
/// The source is scaled to `draw_width × draw_height`; the output surface is
/// `canvas_width × canvas_height`, which is the draw size transposed when the
/// orientation turns the image a quarter turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Geometry {
    pub draw_width: u32,
    pub draw_height: u32,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid dimensions {width}x{height} (max {max_dim})")]
pub struct InvalidDimensions {
    pub width: u32,
    pub height: u32,
    pub max_dim: u32,
}

/// Plan the draw and canvas sizes for a source of `width × height`.
///
/// The longer side is capped at `max_dim`; the shorter side follows the
/// aspect ratio, rounded half away from zero and never below 1. Sources that
/// already fit are never upscaled.
///
/// # Examples
/// ```
/// # use drawalong::imaging::{Orientation, plan_geometry};
/// // 4000x3000 landscape capped at 1600 → 1600x1200
/// let g = plan_geometry(4000, 3000, 1600, Orientation::Normal).unwrap();
/// assert_eq!((g.canvas_width, g.canvas_height), (1600, 1200));
///
/// // Same photo shot in portrait (orientation 6): canvas is transposed
/// let g = plan_geometry(4000, 3000, 1600, Orientation::Rotate90).unwrap();
/// assert_eq!((g.canvas_width, g.canvas_height), (1200, 1600));
/// ```
pub fn plan_geometry(
    width: u32,
    height: u32,
    max_dim: u32,
    orientation: Orientation,
) -> Result<Geometry, InvalidDimensions> {
    if width == 0 || height == 0 || max_dim == 0 {
        return Err(InvalidDimensions {
            width,
            height,
            max_dim,
        });
    }

    let (draw_width, draw_height) = bounded_size(width, height, max_dim);

    let (canvas_width, canvas_height) = if orientation.swaps_axes() {
        (draw_height, draw_width)
    } else {
        (draw_width, draw_height)
    };

    Ok(Geometry {
        draw_width,
        draw_height,
        canvas_width,
        canvas_height,
    })
}

/// Scale `(width, height)` so the longer side is at most `max_dim`.
fn bounded_size(width: u32, height: u32, max_dim: u32) -> (u32, u32) {
    if width.max(height) <= max_dim {
        return (width, height);
    }

    let ratio = width as f64 / height as f64;
    if ratio > 1.0 {
        // Landscape: width is the long side
        let h = (max_dim as f64 / ratio).round() as u32;
        (max_dim, h.max(1))
    } else {
        // Portrait or square
        let w = (max_dim as f64 * ratio).round() as u32;
        (w.max(1), max_dim)
    }
}
