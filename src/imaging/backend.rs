//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the seam between the preview pipeline and the
//! pixel work. The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend); tests substitute a
//! recording mock so they can count how often a transform actually ran.

use super::params::PreviewParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Trait for image processing backends.
///
/// Implementations must be shareable across threads: the preview generator
/// calls them from request threads and from the warmup pool at once.
pub trait ImageBackend: Send + Sync {
    /// Decode, orient, downscale and re-encode a preview, returning the bytes.
    fn render_preview(&self, params: &PreviewParams) -> Result<Vec<u8>, BackendError>;
}
