//! EXIF orientation and the transforms that undo it.
//!
//! Cameras store sensor pixels as captured and record how they should be
//! displayed in the Orientation tag (`0x0112`). The eight values combine a
//! rotation (0°, 90°, 180°, 270°) with an optional mirror:
//!
//! | Value | Variant | Upright by applying |
//! |---|---|---|
//! | 1 | `Normal` | nothing |
//! | 2 | `MirrorHorizontal` | mirror left-right |
//! | 3 | `Rotate180` | rotate 180° |
//! | 4 | `MirrorVertical` | mirror top-bottom |
//! | 5 | `Transpose` | rotate 90° CW, then mirror left-right |
//! | 6 | `Rotate90` | rotate 90° CW |
//! | 7 | `Transverse` | rotate 270° CW, then mirror left-right |
//! | 8 | `Rotate270` | rotate 270° CW |
//!
//! The mapping is a static table ([`Orientation::transforms`]) of
//! [`Transform`] primitives, applied in order by the backend.

use serde::Serialize;
use std::fmt;

/// One of the eight EXIF orientations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum Orientation {
    #[default]
    Normal = 1,
    MirrorHorizontal = 2,
    Rotate180 = 3,
    MirrorVertical = 4,
    Transpose = 5,
    Rotate90 = 6,
    Transverse = 7,
    Rotate270 = 8,
}

/// A single drawing-surface transform primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    MirrorHorizontal,
    MirrorVertical,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl Orientation {
    /// Map a raw tag value to an orientation. Anything outside 1..=8 is `Normal`.
    pub fn from_exif(value: u16) -> Self {
        match value {
            2 => Self::MirrorHorizontal,
            3 => Self::Rotate180,
            4 => Self::MirrorVertical,
            5 => Self::Transpose,
            6 => Self::Rotate90,
            7 => Self::Transverse,
            8 => Self::Rotate270,
            _ => Self::Normal,
        }
    }

    pub fn exif_value(self) -> u16 {
        self as u16
    }

    /// True for 5..=8, the orientations that exchange width and height.
    pub fn swaps_axes(self) -> bool {
        matches!(
            self,
            Self::Transpose | Self::Rotate90 | Self::Transverse | Self::Rotate270
        )
    }

    /// Transform sequence that paints stored pixels upright, in application order.
    pub fn transforms(self) -> &'static [Transform] {
        use Transform::*;
        match self {
            Self::Normal => &[],
            Self::MirrorHorizontal => &[MirrorHorizontal],
            Self::Rotate180 => &[Rotate180],
            Self::MirrorVertical => &[MirrorVertical],
            Self::Transpose => &[Rotate90, MirrorHorizontal],
            Self::Rotate90 => &[Rotate90],
            Self::Transverse => &[Rotate270, MirrorHorizontal],
            Self::Rotate270 => &[Rotate270],
        }
    }

    /// All eight orientations in tag order.
    pub fn all() -> [Orientation; 8] {
        [
            Self::Normal,
            Self::MirrorHorizontal,
            Self::Rotate180,
            Self::MirrorVertical,
            Self::Transpose,
            Self::Rotate90,
            Self::Transverse,
            Self::Rotate270,
        ]
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Normal => "normal",
            Self::MirrorHorizontal => "mirror horizontal",
            Self::Rotate180 => "rotate 180",
            Self::MirrorVertical => "mirror vertical",
            Self::Transpose => "transpose",
            Self::Rotate90 => "rotate 90 cw",
            Self::Transverse => "transverse",
            Self::Rotate270 => "rotate 270 cw",
        };
        write!(f, "{} ({})", self.exif_value(), label)
    }
}
