//! High-level image operations.
//!
//! These functions turn a size-variant spec into backend parameters and call
//! the backend.

use super::backend::{BackendError, ImageBackend};
use super::params::{PreviewParams, Quality};
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Bounding box and encoding quality of one preview size variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewSpec {
    pub max_edge: u32,
    pub quality: Quality,
}

/// Plan a preview render without executing it.
pub fn plan_preview(source: &Path, spec: &PreviewSpec) -> PreviewParams {
    PreviewParams {
        source: source.to_path_buf(),
        max_edge: spec.max_edge,
        quality: spec.quality,
    }
}

/// Render a preview of `source` at `spec` and return the encoded bytes.
pub fn create_preview(
    backend: &impl ImageBackend,
    source: &Path,
    spec: &PreviewSpec,
) -> Result<Vec<u8>> {
    backend.render_preview(&plan_preview(source, spec))
}
