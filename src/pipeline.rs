//! Async normalization.
//!
//! [`Normalizer::normalize`] runs the same three stages as
//! [`imaging::normalize`](crate::imaging::normalize) but suspends twice,
//! while the source is decoded and while the surface is rendered and
//! encoded. Both run on tokio's blocking pool, so an executor serving
//! uploads keeps making progress while pixels are pushed around.
//!
//! ```text
//! inspect (inline) ─▶ decode (blocking) ─▶ plan (inline) ─▶ render+encode (blocking) ─▶ finish
//! ```
//!
//! Calls share only the immutable backend behind an [`Arc`]; any number may
//! be in flight at once. There is no cancellation: dropping the future
//! abandons the result (a blocking stage already started runs to completion
//! and its output is discarded). No timeout is applied here.

use crate::imaging::operations::{
    self, NormalizeError, NormalizeOptions, finish, inspect_source, plan_render,
    render_and_encode,
};
use crate::imaging::{BackendError, ImageBackend, RustBackend};
use crate::types::{NormalizedImage, SourceImage};
use bytes::Bytes;
use image::DynamicImage;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::task::{self, JoinError, JoinSet};
use tracing::{debug, trace};

/// Running totals of decode handles, shared by every clone of a [`Normalizer`].
#[derive(Debug, Default)]
struct HandleCounts {
    acquired: AtomicUsize,
    released: AtomicUsize,
}

/// The source bytes as lent to the decoder.
///
/// Owned by the decode task and dropped the moment decoding finishes,
/// whether it succeeded or not.
struct DecodeHandle {
    data: Bytes,
    counts: Arc<HandleCounts>,
}

impl DecodeHandle {
    fn new(data: Bytes, counts: Arc<HandleCounts>) -> Self {
        counts.acquired.fetch_add(1, Ordering::Relaxed);
        trace!(len = data.len(), "decode handle acquired");
        Self { data, counts }
    }

    fn decode_with(self, backend: &impl ImageBackend) -> Result<DynamicImage, BackendError> {
        backend.decode(&self.data)
    }
}

impl Drop for DecodeHandle {
    fn drop(&mut self) {
        self.counts.released.fetch_add(1, Ordering::Relaxed);
        trace!(len = self.data.len(), "decode handle released");
    }
}

/// Shared, cloneable entry point for async normalization.
pub struct Normalizer<B = RustBackend> {
    backend: Arc<B>,
    options: NormalizeOptions,
    handles: Arc<HandleCounts>,
}

impl<B> Clone for Normalizer<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            options: self.options.clone(),
            handles: Arc::clone(&self.handles),
        }
    }
}

impl Normalizer<RustBackend> {
    pub fn new(options: NormalizeOptions) -> Self {
        Self::with_backend(RustBackend::new(), options)
    }
}

impl Default for Normalizer<RustBackend> {
    fn default() -> Self {
        Self::new(NormalizeOptions::default())
    }
}

impl<B: ImageBackend + 'static> Normalizer<B> {
    pub fn with_backend(backend: B, options: NormalizeOptions) -> Self {
        Self {
            backend: Arc::new(backend),
            options,
            handles: Arc::default(),
        }
    }

    /// Decode handles handed out and dropped so far, across all clones.
    #[cfg(test)]
    fn decode_handle_counts(&self) -> (usize, usize) {
        (
            self.handles.acquired.load(Ordering::Relaxed),
            self.handles.released.load(Ordering::Relaxed),
        )
    }

    /// Normalize one image.
    pub async fn normalize(&self, source: SourceImage) -> operations::Result<NormalizedImage> {
        let orientation = inspect_source(&source)?;

        let handle = DecodeHandle::new(source.data.clone(), Arc::clone(&self.handles));
        let backend = Arc::clone(&self.backend);
        let decoded = task::spawn_blocking(move || handle.decode_with(&*backend))
            .await
            .map_err(|e| join_failure(e, NormalizeError::DecodeFailure))??;

        let params = plan_render(&decoded, orientation, &self.options)?;
        debug!(
            name = source.file_name.as_deref().unwrap_or("-"),
            orientation = orientation.exif_value(),
            geometry = ?params.geometry,
            "planned normalization"
        );

        let backend = Arc::clone(&self.backend);
        let quality = self.options.quality;
        let bytes = task::spawn_blocking(move || {
            render_and_encode(&*backend, &decoded, &params, quality)
        })
        .await
        .map_err(|e| join_failure(e, NormalizeError::EncodeFailure))??;

        Ok(finish(&source, bytes, params, &self.options))
    }

    /// Normalize several images concurrently; results keep input order.
    pub async fn normalize_all(
        &self,
        sources: Vec<SourceImage>,
    ) -> Vec<operations::Result<NormalizedImage>> {
        let count = sources.len();
        let mut set = JoinSet::new();
        for (index, source) in sources.into_iter().enumerate() {
            let normalizer = self.clone();
            set.spawn(async move { (index, normalizer.normalize(source).await) });
        }

        let mut slots: Vec<Option<operations::Result<NormalizedImage>>> =
            (0..count).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => debug!(error = %e, "normalization task did not complete"),
            }
        }

        slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    Err(NormalizeError::EncodeFailure(
                        "normalization task did not complete".into(),
                    ))
                })
            })
            .collect()
    }
}

fn join_failure(err: JoinError, label: fn(String) -> NormalizeError) -> NormalizeError {
    label(format!("worker task failed: {err}"))
}
