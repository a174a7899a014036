//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the four operations the normalizer
//! needs: identify, decode, render and encode. Everything orientation- and
//! size-related is decided before the backend is called; the backend only
//! moves pixels.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests use a recording mock.

use super::params::{Quality, RenderParams};
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Render failed: {0}")]
    Render(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// Implementations hold no per-call state: the async pipeline shares a
/// single backend across concurrent normalizations.
pub trait ImageBackend: Send + Sync {
    /// Read pixel dimensions from the container header without a full decode.
    fn identify(&self, data: &[u8]) -> Result<Dimensions, BackendError>;

    /// Rasterize encoded bytes. Stored pixel order, no orientation applied.
    fn decode(&self, data: &[u8]) -> Result<DynamicImage, BackendError>;

    /// Scale `source` to the draw size and apply the orientation transforms.
    ///
    /// The returned surface is exactly `canvas_width × canvas_height`.
    fn render(
        &self,
        source: &DynamicImage,
        params: &RenderParams,
    ) -> Result<DynamicImage, BackendError>;

    /// Encode a surface as baseline JPEG.
    fn encode_jpeg(&self, surface: &DynamicImage, quality: Quality)
    -> Result<Vec<u8>, BackendError>;
}
