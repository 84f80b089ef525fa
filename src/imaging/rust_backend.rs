//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP, GIF) | `image` crate decoders |
//! | Orientation | `ImageDecoder::orientation` + `DynamicImage::apply_orientation` |
//! | Resize | `image::imageops::resize` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |

use super::backend::{BackendError, ImageBackend};
use super::calculations::calculate_fit_dimensions;
use super::params::{PreviewParams, Quality};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageDecoder, ImageReader};
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_failed(path: &Path, e: impl std::fmt::Display) -> BackendError {
    BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
}

/// Load and decode an image from disk, rotated upright per its EXIF orientation.
fn load_oriented(path: &Path) -> Result<DynamicImage, BackendError> {
    let mut decoder = ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .into_decoder()
        .map_err(|e| decode_failed(path, e))?;

    let orientation = decoder
        .orientation()
        .map_err(|e| decode_failed(path, e))?;
    let mut img = DynamicImage::from_decoder(decoder).map_err(|e| decode_failed(path, e))?;
    img.apply_orientation(orientation);
    Ok(img)
}

/// Encode as baseline JPEG. Alpha is dropped; JPEG has no transparency.
fn encode_jpeg(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality.as_u8());
    rgb.write_with_encoder(encoder)
        .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))?;
    Ok(out)
}

impl ImageBackend for RustBackend {
    fn render_preview(&self, params: &PreviewParams) -> Result<Vec<u8>, BackendError> {
        let img = load_oriented(&params.source)?;

        let resized = match calculate_fit_dimensions(img.dimensions(), params.max_edge) {
            Some((w, h)) => img.resize_exact(w, h, FilterType::Lanczos3),
            None => img,
        };

        encode_jpeg(&resized, params.quality)
    }
}
