//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the [`operations`](super::operations) pipeline (which
//! plans the geometry) and the [`backend`](super::backend) (which does the
//! pixel work).
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality as a fraction (0.5–0.95, default 0.85). Clamped on construction.
//! - [`MaxDimension`]: Cap on the longer output side in pixels (default 1600).
//! - [`RenderParams`]: Everything needed to paint one source onto the output surface.

use super::calculations::Geometry;
use super::orientation::Orientation;
use serde::{Deserialize, Serialize};

/// Encoding quality as a fraction in `[0.5, 0.95]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f32", into = "f32")]
pub struct Quality(f32);

impl Quality {
    pub const MIN: f32 = 0.5;
    pub const MAX: f32 = 0.95;

    /// Clamp `value` into `[0.5, 0.95]`. NaN falls back to the default.
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self::default();
        }
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// The quality on the JPEG encoder's 1–100 scale.
    pub fn percent(self) -> u8 {
        (self.0 * 100.0).round() as u8
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(0.85)
    }
}

impl From<f32> for Quality {
    fn from(value: f32) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for f32 {
    fn from(q: Quality) -> Self {
        q.0
    }
}

/// Upper bound on the longer side of the output, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaxDimension(pub u32);

impl MaxDimension {
    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for MaxDimension {
    fn default() -> Self {
        Self(1600)
    }
}

/// Parameters for painting a decoded source onto the output surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParams {
    pub orientation: Orientation,
    pub geometry: Geometry,
}
