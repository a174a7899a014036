//! Minimal EXIF orientation reader for JPEG files.
//!
//! Finds a single field, Orientation (`0x0112`), and nothing else:
//!
//! 1. The stream must start with SOI (`FF D8`); anything else (PNG, WebP, …)
//!    has no orientation as far as this reader is concerned.
//! 2. Marker segments are walked from offset 2 until APP1 (`FF E1`) or SOS
//!    (`FF DA`).
//! 3. The APP1 payload must start with `Exif`. Six bytes in sits a TIFF
//!    header: byte order (`II`/`MM`), magic, and the offset of IFD0.
//! 4. IFD0's 12-byte entries are scanned for tag `0x0112`; its SHORT value
//!    lives at entry offset 8.
//!
//! Only the first APP1 segment and the first IFD are examined. Files that
//! carry EXIF in a second APP1, or move Orientation out of IFD0, read as
//! `Normal`. The reader never fails: every anomaly degrades to
//! [`Orientation::Normal`].

use super::orientation::Orientation;
use tracing::debug;

const SOI: u16 = 0xFFD8;
const APP1: u16 = 0xFFE1;
const SOS: u16 = 0xFFDA;
const EXIF_SIGNATURE: &[u8] = b"Exif";
/// `Exif\0\0` precedes the TIFF header inside APP1.
const TIFF_HEADER_OFFSET: usize = 6;
const LITTLE_ENDIAN_MARK: u16 = 0x4949; // "II"
const ORIENTATION_TAG: u16 = 0x0112;
const IFD_ENTRY_SIZE: usize = 12;
const MIN_IFD_OFFSET: u32 = 8;

/// Why no orientation was found. Never surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExifAnomaly {
    NotJpeg,
    Truncated,
    MarkerOutOfSync { offset: usize },
    ScanReachedFirst,
    MissingExifSignature,
    IfdOffsetTooSmall(u32),
    TagAbsent,
}

impl std::fmt::Display for ExifAnomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotJpeg => write!(f, "not a JPEG stream"),
            Self::Truncated => write!(f, "stream ends inside a segment"),
            Self::MarkerOutOfSync { offset } => write!(f, "no marker at offset {offset}"),
            Self::ScanReachedFirst => write!(f, "image data starts before any APP1"),
            Self::MissingExifSignature => write!(f, "APP1 is not Exif"),
            Self::IfdOffsetTooSmall(offset) => write!(f, "IFD0 offset {offset} is inside the header"),
            Self::TagAbsent => write!(f, "IFD0 has no orientation tag"),
        }
    }
}

/// Read the EXIF orientation from encoded image bytes.
///
/// Returns [`Orientation::Normal`] for non-JPEG input, missing or malformed
/// EXIF, and out-of-range tag values.
pub fn read_orientation(data: &[u8]) -> Orientation {
    match find_orientation_tag(data) {
        Ok(value) => {
            let orientation = Orientation::from_exif(value);
            if orientation.exif_value() != value {
                debug!(value, "orientation tag out of range, using normal");
            }
            orientation
        }
        Err(ExifAnomaly::NotJpeg) => Orientation::Normal,
        Err(anomaly) => {
            debug!(%anomaly, "no usable EXIF orientation, using normal");
            Orientation::Normal
        }
    }
}

/// Locate the raw Orientation tag value.
pub(crate) fn find_orientation_tag(data: &[u8]) -> Result<u16, ExifAnomaly> {
    if read_u16(data, 0, false) != Some(SOI) {
        return Err(ExifAnomaly::NotJpeg);
    }

    let mut pos = 2;
    loop {
        let marker = read_u16(data, pos, false).ok_or(ExifAnomaly::Truncated)?;
        if marker >> 8 != 0xFF {
            return Err(ExifAnomaly::MarkerOutOfSync { offset: pos });
        }

        match marker {
            APP1 => {
                let seg_len = read_u16(data, pos + 2, false).ok_or(ExifAnomaly::Truncated)?;
                let seg_start = pos + 4;
                // The declared length may run past the buffer; never read beyond either.
                let seg_end = (pos + 2 + seg_len as usize).min(data.len());
                let segment = data.get(seg_start..seg_end).ok_or(ExifAnomaly::Truncated)?;
                return orientation_from_app1(segment);
            }
            SOS => return Err(ExifAnomaly::ScanReachedFirst),
            m if has_no_payload(m) => pos += 2,
            _ => {
                let seg_len = read_u16(data, pos + 2, false).ok_or(ExifAnomaly::Truncated)?;
                if seg_len < 2 {
                    return Err(ExifAnomaly::MarkerOutOfSync { offset: pos });
                }
                pos += 2 + seg_len as usize;
            }
        }
    }
}

/// Standalone markers: TEM, SOI, EOI and the RSTn restart markers.
fn has_no_payload(marker: u16) -> bool {
    matches!(marker, 0xFF01 | 0xFFD0..=0xFFD9)
}

// ---------------------------------------------------------------------------
// APP1 / TIFF header
// ---------------------------------------------------------------------------

/// Parse the Exif payload of an APP1 segment (bytes after the length field).
fn orientation_from_app1(segment: &[u8]) -> Result<u16, ExifAnomaly> {
    if !segment.starts_with(EXIF_SIGNATURE) {
        return Err(ExifAnomaly::MissingExifSignature);
    }

    let tiff = segment
        .get(TIFF_HEADER_OFFSET..)
        .ok_or(ExifAnomaly::Truncated)?;
    let little = read_u16(tiff, 0, false).ok_or(ExifAnomaly::Truncated)? == LITTLE_ENDIAN_MARK;

    let ifd_offset = read_u32(tiff, 4, little).ok_or(ExifAnomaly::Truncated)?;
    if ifd_offset < MIN_IFD_OFFSET {
        return Err(ExifAnomaly::IfdOffsetTooSmall(ifd_offset));
    }

    let dir = ifd_offset as usize;
    let entry_count = read_u16(tiff, dir, little).ok_or(ExifAnomaly::Truncated)?;

    for i in 0..entry_count as usize {
        let entry = dir + 2 + i * IFD_ENTRY_SIZE;
        let tag = read_u16(tiff, entry, little).ok_or(ExifAnomaly::Truncated)?;
        if tag == ORIENTATION_TAG {
            return read_u16(tiff, entry + 8, little).ok_or(ExifAnomaly::Truncated);
        }
    }

    Err(ExifAnomaly::TagAbsent)
}

fn read_u16(data: &[u8], offset: usize, little: bool) -> Option<u16> {
    let bytes: [u8; 2] = data.get(offset..offset.checked_add(2)?)?.try_into().ok()?;
    Some(if little {
        u16::from_le_bytes(bytes)
    } else {
        u16::from_be_bytes(bytes)
    })
}

fn read_u32(data: &[u8], offset: usize, little: bool) -> Option<u32> {
    let bytes: [u8; 4] = data.get(offset..offset.checked_add(4)?)?.try_into().ok()?;
    Some(if little {
        u32::from_le_bytes(bytes)
    } else {
        u32::from_be_bytes(bytes)
    })
}
