//! Output file names for normalized images.
//!
//! The last extension of the upload's name is replaced with `.jpg`:
//! - `photo.png` → `photo.jpg`
//! - `photo` → `photo.jpg`
//! - `scan.2024.heic` → `scan.2024.jpg`
//!
//! A missing or empty base name falls back to a configurable default
//! (`drawing` unless overridden).

use crate::types::OUTPUT_EXTENSION;

pub const DEFAULT_BASE_NAME: &str = "drawing";

/// Strip the final `.ext` (one or more characters, no `.` or `/`).
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) => {
            let ext = &name[dot + 1..];
            if ext.is_empty() || ext.contains('/') {
                name
            } else {
                &name[..dot]
            }
        }
        None => name,
    }
}

/// Derive the normalized file name for an upload.
pub fn output_file_name(name: Option<&str>, default_base: &str) -> String {
    let base = name.map(str::trim).map(strip_extension).unwrap_or("");
    let base = if base.is_empty() { default_base } else { base };
    format!("{base}.{OUTPUT_EXTENSION}")
}
