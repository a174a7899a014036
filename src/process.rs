//! Batch normalization of files on disk.
//!
//! Backs the `normalize` and `inspect` commands. Inputs are files or
//! directories; directories are walked recursively for files whose extension
//! has a decoder compiled in (see
//! [`supported_input_extensions`](crate::imaging::supported_input_extensions)).
//!
//! ## Output Structure
//!
//! Every input becomes one flat JPEG in the output directory, named after the
//! source with its extension replaced:
//!
//! ```text
//! uploads/                     out/
//! ├── cat.png          ──▶     ├── cat.jpg
//! ├── IMG_0001.HEIC.jpeg ──▶   ├── IMG_0001.HEIC.jpg
//! └── farm/
//!     └── cow.webp     ──▶     └── cow.jpg
//! ```
//!
//! Two inputs that would land on the same output name abort the batch before
//! anything is written.
//!
//! ## Parallel Processing
//!
//! Files are normalized in parallel with [rayon](https://docs.rs/rayon). A
//! failing file does not stop the others; it is reported as a
//! [`FailedFile`] and counted in the [`BatchSummary`]. Progress is streamed
//! as [`ProcessEvent`]s over an optional channel so the CLI can print while
//! the pool works.

use crate::imaging::{
    Geometry, ImageBackend, NormalizationPlan, NormalizeOptions, Orientation, normalize,
    plan_normalization, supported_input_extensions,
};
use crate::naming::output_file_name;
use crate::types::SourceImage;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Input not found: {0}")]
    InputNotFound(PathBuf),
    #[error("{} and {} would both be written as {name}", .first.display(), .second.display())]
    NameCollision {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// A file that was normalized and written.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedFile {
    pub source: PathBuf,
    pub output: PathBuf,
    pub orientation: Orientation,
    pub geometry: Geometry,
    pub input_bytes: u64,
    pub output_bytes: u64,
}

/// A file that could not be normalized.
#[derive(Debug, Clone, Serialize)]
pub struct FailedFile {
    pub source: PathBuf,
    /// Failure category, e.g. `invalid image`.
    pub kind: String,
    pub message: String,
}

/// Progress events emitted as each file finishes.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    Normalized(NormalizedFile),
    Failed(FailedFile),
}

/// Result of a batch run, in input order.
#[derive(Debug, Default, Serialize)]
pub struct BatchSummary {
    pub normalized: Vec<NormalizedFile>,
    pub failed: Vec<FailedFile>,
}

impl BatchSummary {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn input_bytes(&self) -> u64 {
        self.normalized.iter().map(|f| f.input_bytes).sum()
    }

    pub fn output_bytes(&self) -> u64 {
        self.normalized.iter().map(|f| f.output_bytes).sum()
    }
}

/// A header-only plan for one file.
#[derive(Debug)]
pub struct InspectedFile {
    pub source: PathBuf,
    pub plan: Result<NormalizationPlan, FailedFile>,
}

/// Expand the given paths into a sorted, de-duplicated list of image files.
///
/// Files named explicitly are always included, whatever their extension.
/// Directories contribute only files with a supported extension.
pub fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>, ProcessError> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry?;
                if entry.file_type().is_file() && has_supported_extension(entry.path()) {
                    files.push(entry.into_path());
                }
            }
        } else {
            return Err(ProcessError::InputNotFound(path.clone()));
        }
    }
    let mut seen = std::collections::HashSet::new();
    files.retain(|f| seen.insert(f.clone()));
    Ok(files)
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| supported_input_extensions().contains(&e.as_str()))
}

/// Normalize every input into `out_dir` as `<base>.jpg`.
///
/// Returns `Err` only for batch-level problems (output directory, name
/// collisions). Per-file failures are collected in the summary.
pub fn normalize_files(
    backend: &impl ImageBackend,
    inputs: &[PathBuf],
    out_dir: &Path,
    options: &NormalizeOptions,
    events: Option<Sender<ProcessEvent>>,
) -> Result<BatchSummary, ProcessError> {
    let planned = plan_outputs(inputs, out_dir, options)?;
    std::fs::create_dir_all(out_dir)?;

    let outcomes: Vec<Result<NormalizedFile, FailedFile>> = planned
        .par_iter()
        .map_with(events, |events, (source, output)| {
            let outcome = normalize_one(backend, source, output, options);
            if let Some(tx) = events {
                let event = match &outcome {
                    Ok(done) => ProcessEvent::Normalized(done.clone()),
                    Err(failed) => ProcessEvent::Failed(failed.clone()),
                };
                // Receiver hung up: keep working, the summary still has it.
                tx.send(event).ok();
            }
            outcome
        })
        .collect();

    let mut summary = BatchSummary::default();
    for outcome in outcomes {
        match outcome {
            Ok(done) => summary.normalized.push(done),
            Err(failed) => summary.failed.push(failed),
        }
    }
    debug!(
        normalized = summary.normalized.len(),
        failed = summary.failed.len(),
        "batch finished"
    );
    Ok(summary)
}

/// Pair each input with its output path, rejecting collisions.
fn plan_outputs(
    inputs: &[PathBuf],
    out_dir: &Path,
    options: &NormalizeOptions,
) -> Result<Vec<(PathBuf, PathBuf)>, ProcessError> {
    let mut claimed: HashMap<String, &PathBuf> = HashMap::new();
    let mut planned = Vec::with_capacity(inputs.len());
    for input in inputs {
        let source_name = input.file_name().map(|n| n.to_string_lossy());
        let name = output_file_name(source_name.as_deref(), &options.default_name);
        if let Some(first) = claimed.get(&name) {
            return Err(ProcessError::NameCollision {
                name,
                first: (*first).clone(),
                second: input.clone(),
            });
        }
        planned.push((input.clone(), out_dir.join(&name)));
        claimed.insert(name, input);
    }
    Ok(planned)
}

fn normalize_one(
    backend: &impl ImageBackend,
    source_path: &Path,
    output_path: &Path,
    options: &NormalizeOptions,
) -> Result<NormalizedFile, FailedFile> {
    let fail = |kind: &str, message: String| {
        warn!(source = %source_path.display(), kind, %message, "normalization failed");
        FailedFile {
            source: source_path.to_path_buf(),
            kind: kind.to_string(),
            message,
        }
    };

    let source = SourceImage::from_path(source_path)
        .map_err(|e| fail("read error", format!("Could not read file: {e}")))?;
    let normalized = normalize(backend, &source, options)
        .map_err(|e| fail(&e.kind().to_string(), e.to_string()))?;
    std::fs::write(output_path, &normalized.data)
        .map_err(|e| fail("write error", format!("Could not write {}: {e}", output_path.display())))?;

    Ok(NormalizedFile {
        source: source_path.to_path_buf(),
        output: output_path.to_path_buf(),
        orientation: normalized.orientation,
        geometry: normalized.geometry,
        input_bytes: source.data.len() as u64,
        output_bytes: normalized.len() as u64,
    })
}

/// Orientation and geometry for each input, without decoding pixels.
pub fn inspect_files(
    backend: &impl ImageBackend,
    inputs: &[PathBuf],
    options: &NormalizeOptions,
) -> Vec<InspectedFile> {
    inputs
        .iter()
        .map(|path| {
            let plan = SourceImage::from_path(path)
                .map_err(|e| FailedFile {
                    source: path.clone(),
                    kind: "read error".to_string(),
                    message: format!("Could not read file: {e}"),
                })
                .and_then(|source| {
                    plan_normalization(backend, &source, options).map_err(|e| FailedFile {
                        source: path.clone(),
                        kind: e.kind().to_string(),
                        message: e.to_string(),
                    })
                });
            InspectedFile {
                source: path.clone(),
                plan,
            }
        })
        .collect()
}
