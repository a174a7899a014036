//! Pure Rust image backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::ImageReader::into_dimensions` (header only) |
//! | Decode (JPEG, PNG, TIFF, WebP, GIF) | `image::load_from_memory` |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Orientation | `fliph` / `flipv` / `rotate90` / `rotate180` / `rotate270` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//!
//! The `image` JPEG decoder does not apply EXIF orientation on its own, so
//! decoded pixels arrive in stored order and [`Orientation`] is applied
//! exactly once, here.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::orientation::{Orientation, Transform};
use super::params::{Quality, RenderParams};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageEncoder, ImageFormat, ImageReader, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::LazyLock;

/// Extensions whose decoders are compiled in.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
    ("gif", ImageFormat::Gif),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply an orientation's transform sequence to `img`.
fn apply_orientation(img: DynamicImage, orientation: Orientation) -> DynamicImage {
    orientation
        .transforms()
        .iter()
        .fold(img, |img, transform| match transform {
            Transform::MirrorHorizontal => img.fliph(),
            Transform::MirrorVertical => img.flipv(),
            Transform::Rotate90 => img.rotate90(),
            Transform::Rotate180 => img.rotate180(),
            Transform::Rotate270 => img.rotate270(),
        })
}

/// Drop the alpha channel, compositing over white.
///
/// JPEG has no alpha; transparent drawing backgrounds should come out white,
/// not black.
fn flatten_to_rgb(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as u16;
        let over_white = |c: u8| ((c as u16 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([over_white(r), over_white(g), over_white(b)])
    })
}

impl ImageBackend for RustBackend {
    fn identify(&self, data: &[u8]) -> Result<Dimensions, BackendError> {
        let (width, height) = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| BackendError::Decode(format!("Failed to sniff format: {e}")))?
            .into_dimensions()
            .map_err(|e| BackendError::Decode(format!("Failed to read dimensions: {e}")))?;
        Ok(Dimensions { width, height })
    }

    fn decode(&self, data: &[u8]) -> Result<DynamicImage, BackendError> {
        image::load_from_memory(data).map_err(|e| BackendError::Decode(e.to_string()))
    }

    fn render(
        &self,
        source: &DynamicImage,
        params: &RenderParams,
    ) -> Result<DynamicImage, BackendError> {
        let g = params.geometry;
        let scaled = if (source.width(), source.height()) == (g.draw_width, g.draw_height) {
            source.clone()
        } else {
            source.resize_exact(g.draw_width, g.draw_height, FilterType::Lanczos3)
        };

        let surface = apply_orientation(scaled, params.orientation);
        if (surface.width(), surface.height()) != (g.canvas_width, g.canvas_height) {
            return Err(BackendError::Render(format!(
                "surface is {}x{}, expected {}x{}",
                surface.width(),
                surface.height(),
                g.canvas_width,
                g.canvas_height
            )));
        }
        Ok(surface)
    }

    fn encode_jpeg(
        &self,
        surface: &DynamicImage,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError> {
        let rgb = flatten_to_rgb(surface);
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, quality.percent())
            .write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| BackendError::Encode(e.to_string()))?;

        if buf.is_empty() {
            return Err(BackendError::Encode("encoder produced no data".into()));
        }
        Ok(buf)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::imaging::Geometry;
    use image::{GenericImageView, Rgba, RgbaImage};

    /// Encode a small gradient JPEG in memory.
    pub(crate) fn create_test_jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut buf = Vec::new();
        JpegEncoder::new(&mut buf)
            .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
            .unwrap();
        buf
    }

    pub(crate) fn create_test_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 255, 255]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    /// Independent reference for where stored pixel `(x, y)` lands upright.
    fn expected_position(o: Orientation, x: u32, y: u32, w: u32, h: u32) -> (u32, u32) {
        match o.exif_value() {
            1 => (x, y),
            2 => (w - 1 - x, y),
            3 => (w - 1 - x, h - 1 - y),
            4 => (x, h - 1 - y),
            5 => (y, x),
            6 => (h - 1 - y, x),
            7 => (h - 1 - y, w - 1 - x),
            8 => (y, w - 1 - x),
            _ => unreachable!(),
        }
    }

    #[test]
    fn supported_extensions_match_decodable_formats() {
        let exts = supported_input_extensions();
        for expected in &["jpg", "jpeg", "png", "webp"] {
            assert!(
                exts.contains(expected),
                "expected {expected} in supported extensions"
            );
        }
    }

    #[test]
    fn identify_synthetic_jpeg() {
        let data = create_test_jpeg(200, 150);
        let dims = RustBackend::new().identify(&data).unwrap();
        assert_eq!(dims, Dimensions { width: 200, height: 150 });
    }

    #[test]
    fn decode_garbage_errors() {
        let result = RustBackend::new().decode(b"definitely not an image");
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn decode_truncated_jpeg_errors() {
        let mut data = create_test_jpeg(64, 64);
        data.truncate(40);
        assert!(RustBackend::new().decode(&data).is_err());
    }

    #[test]
    fn render_places_every_pixel_for_each_orientation() {
        let (w, h) = (3, 2);
        let source = DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
            Rgb([x as u8 * 60, y as u8 * 60, 7])
        }));

        for o in Orientation::all() {
            let geometry = crate::imaging::plan_geometry(w, h, 1600, o).unwrap();
            let surface = RustBackend::new()
                .render(&source, &RenderParams { orientation: o, geometry })
                .unwrap();
            assert_eq!(
                (surface.width(), surface.height()),
                (geometry.canvas_width, geometry.canvas_height)
            );

            for y in 0..h {
                for x in 0..w {
                    let (dx, dy) = expected_position(o, x, y, w, h);
                    assert_eq!(
                        surface.get_pixel(dx, dy),
                        source.get_pixel(x, y),
                        "orientation {o}: ({x},{y}) should land at ({dx},{dy})"
                    );
                }
            }
        }
    }

    #[test]
    fn render_scales_to_draw_size_before_rotating() {
        let source = DynamicImage::new_rgb8(400, 300);
        let geometry = Geometry {
            draw_width: 200,
            draw_height: 150,
            canvas_width: 150,
            canvas_height: 200,
        };
        let surface = RustBackend::new()
            .render(
                &source,
                &RenderParams {
                    orientation: Orientation::Rotate90,
                    geometry,
                },
            )
            .unwrap();
        assert_eq!((surface.width(), surface.height()), (150, 200));
    }

    #[test]
    fn render_rejects_inconsistent_geometry() {
        let source = DynamicImage::new_rgb8(10, 10);
        let geometry = Geometry {
            draw_width: 10,
            draw_height: 5,
            canvas_width: 10,
            canvas_height: 5,
        };
        // A quarter turn cannot produce a 10x5 canvas from a 10x5 draw.
        let result = RustBackend::new().render(
            &source,
            &RenderParams {
                orientation: Orientation::Rotate270,
                geometry,
            },
        );
        assert!(matches!(result, Err(BackendError::Render(_))));
    }

    #[test]
    fn encode_produces_decodable_jpeg() {
        let surface = DynamicImage::new_rgb8(40, 30);
        let bytes = RustBackend::new()
            .encode_jpeg(&surface, Quality::default())
            .unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(
            image::guess_format(&bytes).unwrap(),
            ImageFormat::Jpeg
        );
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (40, 30));
    }

    #[test]
    fn higher_quality_is_not_smaller() {
        let data = create_test_jpeg(128, 128);
        let surface = image::load_from_memory(&data).unwrap();
        let backend = RustBackend::new();
        let low = backend.encode_jpeg(&surface, Quality::new(0.5)).unwrap();
        let high = backend.encode_jpeg(&surface, Quality::new(0.95)).unwrap();
        assert!(high.len() >= low.len());
    }

    #[test]
    fn transparent_pixels_flatten_to_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0])));
        let rgb = flatten_to_rgb(&img);
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([255, 255, 255]));

        let opaque = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 255])));
        assert_eq!(flatten_to_rgb(&opaque).get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn png_source_decodes() {
        let data = create_test_png(12, 8);
        let img = RustBackend::new().decode(&data).unwrap();
        assert_eq!((img.width(), img.height()), (12, 8));
    }
}
