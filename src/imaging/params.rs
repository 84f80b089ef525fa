//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between [`operations`](super::operations), which decides what a
//! size variant means, and the [`backend`](super::backend), which does the
//! pixel work.

use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// The value as the encoder takes it. Always 1-100.
    pub fn as_u8(self) -> u8 {
        self.0 as u8
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Parameters for one preview render.
///
/// The output fits inside a `max_edge` × `max_edge` box with the source
/// aspect ratio preserved. Sources already inside the box keep their size.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewParams {
    pub source: PathBuf,
    pub max_edge: u32,
    pub quality: Quality,
}
