//! Image normalization: orientation, bounded resize, JPEG re-encode.
//!
//! | Stage | Module / function |
//! |---|---|
//! | **Orientation** | custom EXIF reader (JPEG APP1 + TIFF IFD0), [`read_orientation`] |
//! | **Geometry** | [`plan_geometry`], pure |
//! | **Render** | Lanczos3 resize + orientation transforms |
//! | **Encode** | `image` JPEG encoder at a clamped [`Quality`] |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Orientation / EXIF**: The 8-way orientation enum and its byte-level reader
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: The stage functions and the synchronous pipeline

pub mod backend;
mod calculations;
pub mod exif;
pub mod operations;
pub mod orientation;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{Geometry, InvalidDimensions, plan_geometry};
pub use exif::read_orientation;
pub use operations::{
    ErrorKind, NormalizationPlan, NormalizeError, NormalizeOptions, normalize, plan_normalization,
};
pub use orientation::{Orientation, Transform};
pub use params::{MaxDimension, Quality, RenderParams};
pub use rust_backend::{RustBackend, supported_input_extensions};
