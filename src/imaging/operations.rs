//! The normalization pipeline.
//!
//! These functions combine metadata extraction, geometry planning and a
//! backend into the three ordered stages:
//!
//! ```text
//! 1. Metadata   bytes            →  Orientation        (exif::read_orientation)
//! 2. Geometry   size + bound     →  Geometry           (calculations::plan_geometry)
//! 3. Render     decoded + plan   →  JPEG bytes         (backend render + encode)
//! ```
//!
//! [`normalize`] runs all three synchronously. The async
//! [`Normalizer`](crate::pipeline::Normalizer) calls the individual stage
//! functions so it can suspend around decode and encode.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{Geometry, InvalidDimensions, plan_geometry};
use super::exif::read_orientation;
use super::orientation::Orientation;
use super::params::{MaxDimension, Quality, RenderParams};
use crate::naming::{DEFAULT_BASE_NAME, output_file_name};
use crate::types::{NormalizedImage, OUTPUT_MEDIA_TYPE, SourceImage};
use bytes::Bytes;
use image::DynamicImage;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// A labeled normalization failure.
///
/// Metadata problems never appear here: they degrade to orientation 1.
#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("Invalid image file: {0}")]
    InvalidInput(String),
    #[error("Invalid image: {0}")]
    DecodeFailure(String),
    #[error("Compression failed: {0}")]
    EncodeFailure(String),
}

/// Failure category, for callers that pick a UI message per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    DecodeFailure,
    EncodeFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InvalidInput => "invalid input",
            Self::DecodeFailure => "invalid image",
            Self::EncodeFailure => "compression failed",
        })
    }
}

impl NormalizeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::DecodeFailure(_) => ErrorKind::DecodeFailure,
            Self::EncodeFailure(_) => ErrorKind::EncodeFailure,
        }
    }
}

impl From<BackendError> for NormalizeError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Decode(msg) => Self::DecodeFailure(msg),
            BackendError::Render(msg) | BackendError::Encode(msg) => Self::EncodeFailure(msg),
        }
    }
}

impl From<InvalidDimensions> for NormalizeError {
    fn from(err: InvalidDimensions) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

/// Result type for normalization.
pub type Result<T> = std::result::Result<T, NormalizeError>;

/// Per-call knobs: size bound, quality, fallback base name.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOptions {
    pub max_dimension: MaxDimension,
    pub quality: Quality,
    pub default_name: String,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            max_dimension: MaxDimension::default(),
            quality: Quality::default(),
            default_name: DEFAULT_BASE_NAME.to_string(),
        }
    }
}

/// What a normalization would do, computed from the header only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizationPlan {
    pub orientation: Orientation,
    pub natural: Dimensions,
    pub geometry: Geometry,
}

// ============================================================================
// Stages
// ============================================================================

/// Stage 1: reject non-images, read the orientation.
pub fn inspect_source(source: &SourceImage) -> Result<Orientation> {
    if !source.declares_image() {
        return Err(NormalizeError::InvalidInput(format!(
            "media type {:?} is not an image",
            source.media_type
        )));
    }
    if source.data.is_empty() {
        return Err(NormalizeError::InvalidInput("empty file".into()));
    }
    Ok(read_orientation(&source.data))
}

/// Stage 2: geometry for a decoded source.
pub fn plan_render(
    decoded: &DynamicImage,
    orientation: Orientation,
    options: &NormalizeOptions,
) -> Result<RenderParams> {
    let geometry = plan_geometry(
        decoded.width(),
        decoded.height(),
        options.max_dimension.value(),
        orientation,
    )?;
    Ok(RenderParams {
        orientation,
        geometry,
    })
}

/// Stage 3: paint and encode. Empty encoder output is a failure.
pub fn render_and_encode(
    backend: &impl ImageBackend,
    decoded: &DynamicImage,
    params: &RenderParams,
    quality: Quality,
) -> Result<Vec<u8>> {
    let surface = backend.render(decoded, params)?;
    let bytes = backend.encode_jpeg(&surface, quality)?;
    if bytes.is_empty() {
        return Err(NormalizeError::EncodeFailure(
            "encoder returned no data".into(),
        ));
    }
    Ok(bytes)
}

/// Package encoded bytes with the derived name.
pub fn finish(
    source: &SourceImage,
    bytes: Vec<u8>,
    params: RenderParams,
    options: &NormalizeOptions,
) -> NormalizedImage {
    NormalizedImage {
        data: Bytes::from(bytes),
        media_type: OUTPUT_MEDIA_TYPE,
        file_name: output_file_name(source.file_name.as_deref(), &options.default_name),
        orientation: params.orientation,
        geometry: params.geometry,
    }
}

// ============================================================================
// Whole pipeline
// ============================================================================

/// Normalize one image synchronously.
pub fn normalize(
    backend: &impl ImageBackend,
    source: &SourceImage,
    options: &NormalizeOptions,
) -> Result<NormalizedImage> {
    let orientation = inspect_source(source)?;
    let decoded = backend.decode(&source.data)?;
    let params = plan_render(&decoded, orientation, options)?;
    debug!(
        name = source.file_name.as_deref().unwrap_or("-"),
        orientation = orientation.exif_value(),
        geometry = ?params.geometry,
        "planned normalization"
    );
    let bytes = render_and_encode(backend, &decoded, &params, options.quality)?;
    Ok(finish(source, bytes, params, options))
}

/// Plan a normalization without decoding pixels.
///
/// Useful for previews and the `inspect` command.
pub fn plan_normalization(
    backend: &impl ImageBackend,
    source: &SourceImage,
    options: &NormalizeOptions,
) -> Result<NormalizationPlan> {
    let orientation = inspect_source(source)?;
    let natural = backend.identify(&source.data)?;
    let geometry = plan_geometry(
        natural.width,
        natural.height,
        options.max_dimension.value(),
        orientation,
    )?;
    Ok(NormalizationPlan {
        orientation,
        natural,
        geometry,
    })
}
