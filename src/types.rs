//! Input and output values of a normalization.

use crate::imaging::{Geometry, Orientation};
use bytes::Bytes;
use std::path::Path;

/// Media type of every normalized image.
pub const OUTPUT_MEDIA_TYPE: &str = "image/jpeg";
/// File extension of every normalized image.
pub const OUTPUT_EXTENSION: &str = "jpg";

/// An uploaded image as received: encoded bytes, declared media type, optional name.
///
/// `data` is a [`Bytes`] so the async pipeline can hand a view of it to a
/// blocking decode task without copying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub data: Bytes,
    pub media_type: String,
    pub file_name: Option<String>,
}

impl SourceImage {
    pub fn new(
        data: impl Into<Bytes>,
        media_type: impl Into<String>,
        file_name: Option<String>,
    ) -> Self {
        Self {
            data: data.into(),
            media_type: media_type.into(),
            file_name,
        }
    }

    /// Read a file from disk, declaring its media type from the extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let data = std::fs::read(path)?;
        let media_type = media_type_for_path(path).unwrap_or("application/octet-stream");
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        Ok(Self::new(data, media_type, file_name))
    }

    pub fn declares_image(&self) -> bool {
        self.media_type
            .trim()
            .to_ascii_lowercase()
            .starts_with("image/")
    }
}

/// The re-encoded result. Always JPEG.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage {
    pub data: Bytes,
    pub media_type: &'static str,
    pub file_name: String,
    /// Orientation read from the source and corrected in `data`.
    pub orientation: Orientation,
    pub geometry: Geometry,
}

impl NormalizedImage {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Media type for a file extension the decoders understand.
pub fn media_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "tif" | "tiff" => "image/tiff",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn media_type_from_extension() {
        assert_eq!(media_type_for_path(Path::new("a.JPG")), Some("image/jpeg"));
        assert_eq!(media_type_for_path(Path::new("a.png")), Some("image/png"));
        assert_eq!(media_type_for_path(Path::new("a.txt")), None);
        assert_eq!(media_type_for_path(Path::new("noext")), None);
    }

    #[test]
    fn declares_image_checks_prefix() {
        let img = SourceImage::new(vec![1], "image/png", None);
        assert!(img.declares_image());
        let upper = SourceImage::new(vec![1], "Image/HEIC", None);
        assert!(upper.declares_image());
        let pdf = SourceImage::new(vec![1], "application/pdf", None);
        assert!(!pdf.declares_image());
    }

    #[test]
    fn from_path_reads_bytes_and_name() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path: PathBuf = tmp.path().join("sketch.png");
        std::fs::write(&path, [1, 2, 3]).unwrap();

        let src = SourceImage::from_path(&path).unwrap();
        assert_eq!(src.data.as_ref(), &[1, 2, 3]);
        assert_eq!(src.media_type, "image/png");
        assert_eq!(src.file_name.as_deref(), Some("sketch.png"));
    }

    #[test]
    fn from_path_unknown_extension_is_octet_stream() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("notes.txt");
        std::fs::write(&path, "hi").unwrap();
        let src = SourceImage::from_path(&path).unwrap();
        assert!(!src.declares_image());
    }
}
