//! # DrawAlong
//!
//! Upload image normalizer for DrawAlong drawing submissions. Phone photos of
//! paper drawings arrive sideways, huge, and in whatever format the camera
//! chose; every upload leaves here upright, bounded and as JPEG.
//!
//! # Architecture: Three-Stage Pipeline
//!
//! ```text
//! 1. Metadata   bytes          →  orientation    (EXIF APP1 / TIFF IFD0 walk)
//! 2. Geometry   size + bound   →  draw + canvas  (pure arithmetic)
//! 3. Render     pixels + plan  →  JPEG bytes     (resize, orient, encode)
//! ```
//!
//! Each stage is a plain function over values, so the pipeline can be driven
//! synchronously ([`imaging::normalize`], used by the CLI's rayon batch) or
//! asynchronously ([`pipeline::Normalizer`], which suspends around decode and
//! encode on tokio's blocking pool).
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Orientation reader, geometry planner, render/encode backend, the stage functions |
//! | [`pipeline`] | Async `Normalizer` with concurrent batches |
//! | [`types`] | `SourceImage` / `NormalizedImage` value types |
//! | [`naming`] | Output file name derivation (`photo.png` → `photo.jpg`) |
//! | [`submission`] | Upload form validation, reviewer email, store/relay traits |
//! | [`process`] | Batch normalization of files on disk |
//! | [`config`] | `drawalong.toml` loading, merging and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Metadata Never Fails an Upload
//!
//! The orientation reader returns a value, not a `Result`. A PNG, a truncated
//! APP1 segment or an IFD pointing past the end of the file all mean "as
//! stored". Only undecodable pixels or a failed encode reject an upload.
//!
//! ## One APP1, One IFD
//!
//! The reader inspects the first `Exif` APP1 segment and its first IFD, and
//! stops at the start of scan. Orientation lives in IFD0 in every camera file
//! seen in practice; anything else is treated as absent.
//!
//! ## Bounded, Never Upscaled
//!
//! The longer side is capped at `max_dimension` (1600 by default). Images
//! already within the bound keep their size; a small doodle stays small.
//!
//! ## Quality Is Clamped at Runtime, Checked in Config
//!
//! A quality passed through the API or the `--quality` flag is forced into
//! 0.5 to 0.95 by [`imaging::Quality::new`]; there is no error path for it.
//! `drawalong.toml` is stricter: `normalize.quality` outside `0..=1` fails
//! [`config::AppConfig::validate`], since a typo in a file should be caught
//! rather than silently clamped.

pub mod config;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod submission;
pub mod types;
