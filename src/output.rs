//! CLI output formatting for the `normalize` and `inspect` commands.
//!
//! # Information-First Display
//!
//! Every file gets a header line naming the source, followed by indented
//! context lines: orientation, geometry, byte counts. Paths are secondary
//! context, the source's file name is its identity.
//!
//! # Output Format
//!
//! ## Normalize
//!
//! ```text
//! cat.png → out/cat.jpg
//!     Orientation: 6 (rotate 90 cw)
//!     Size: 1600x1200 drawn on 1200x1600
//!     Bytes: 3.1 MB → 412.0 KB
//! broken.jpg ✗ invalid image
//!     Invalid image: Failed to decode image: ...
//!
//! Normalized 1 file, 1 failed (3.1 MB → 412.0 KB)
//! ```
//!
//! ## Inspect
//!
//! ```text
//! cat.jpg
//!     Orientation: 6 (rotate 90 cw)
//!     Natural: 4032x3024
//!     Output: 1200x1600
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::imaging::Geometry;
use crate::process::{BatchSummary, FailedFile, InspectedFile, NormalizedFile, ProcessEvent};
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// The identity shown for a file: its name, or the whole path if it has none.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Human-readable byte count with one decimal above 1 KB.
fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{bytes} B")
    }
}

fn geometry_line(geometry: &Geometry) -> String {
    if (geometry.draw_width, geometry.draw_height)
        == (geometry.canvas_width, geometry.canvas_height)
    {
        format!("{}x{}", geometry.canvas_width, geometry.canvas_height)
    } else {
        format!(
            "{}x{} drawn on {}x{}",
            geometry.draw_width, geometry.draw_height, geometry.canvas_width, geometry.canvas_height
        )
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

// ============================================================================
// Normalize
// ============================================================================

fn format_normalized(file: &NormalizedFile) -> Vec<String> {
    vec![
        format!(
            "{} → {}",
            display_name(&file.source),
            file.output.display()
        ),
        format!("{}Orientation: {}", indent(1), file.orientation),
        format!("{}Size: {}", indent(1), geometry_line(&file.geometry)),
        format!(
            "{}Bytes: {} → {}",
            indent(1),
            format_bytes(file.input_bytes),
            format_bytes(file.output_bytes)
        ),
    ]
}

fn format_failed(file: &FailedFile) -> Vec<String> {
    vec![
        format!("{} ✗ {}", display_name(&file.source), file.kind),
        format!("{}{}", indent(1), file.message),
    ]
}

/// Lines for one finished file, as streamed during a batch.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::Normalized(file) => format_normalized(file),
        ProcessEvent::Failed(file) => format_failed(file),
    }
}

/// Closing line of a batch.
pub fn format_summary(summary: &BatchSummary) -> Vec<String> {
    let mut line = format!("Normalized {}", plural(summary.normalized.len(), "file"));
    if summary.has_failures() {
        line.push_str(&format!(", {} failed", summary.failed.len()));
    }
    if !summary.normalized.is_empty() {
        line.push_str(&format!(
            " ({} → {})",
            format_bytes(summary.input_bytes()),
            format_bytes(summary.output_bytes())
        ));
    }
    vec![String::new(), line]
}

pub fn print_summary(summary: &BatchSummary) {
    for line in format_summary(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Inspect
// ============================================================================

pub fn format_inspect_output(files: &[InspectedFile]) -> Vec<String> {
    let mut lines = Vec::new();
    for file in files {
        match &file.plan {
            Ok(plan) => {
                lines.push(display_name(&file.source));
                lines.push(format!("{}Orientation: {}", indent(1), plan.orientation));
                lines.push(format!(
                    "{}Natural: {}x{}",
                    indent(1),
                    plan.natural.width,
                    plan.natural.height
                ));
                lines.push(format!("{}Output: {}", indent(1), geometry_line(&plan.geometry)));
            }
            Err(failed) => lines.extend(format_failed(failed)),
        }
    }
    lines
}

pub fn print_inspect_output(files: &[InspectedFile]) {
    for line in format_inspect_output(files) {
        println!("{}", line);
    }
}
