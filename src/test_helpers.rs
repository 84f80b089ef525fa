//! Shared test utilities for the rawshelf test suite.
//!
//! Builds throwaway library trees in a temp directory. JPEG paths get a real,
//! decodable image so the imaging backend can run on them; every other file
//! gets a few placeholder bytes derived from its path.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let (tmp, guard) = library_with(&["Vacation/beach.jpg", "Vacation/beach.ARW"]);
//! let listing = listing::list(&guard, "Vacation", false).unwrap();
//! ```

use crate::safe_path::PathGuard;
use image::{ImageEncoder, RgbImage};
use std::path::Path;
use tempfile::TempDir;

/// Create a temp library containing `files` (relative, `/`-separated).
pub fn library_with(files: &[&str]) -> (TempDir, PathGuard) {
    let tmp = TempDir::new().unwrap();
    for rel in files {
        let path = tmp.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let is_jpeg = Path::new(rel)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"));
        if is_jpeg {
            create_test_jpeg(&path, 64, 48);
        } else {
            std::fs::write(&path, format!("contents of {rel}")).unwrap();
        }
    }
    let guard = PathGuard::new(tmp.path()).unwrap();
    (tmp, guard)
}

/// Create a small valid JPEG file with the given dimensions.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Create a JPEG whose stored pixels are `width`×`height`, tagged with an
/// EXIF orientation (1-8) in an APP1 segment right after SOI.
pub fn create_oriented_jpeg(path: &Path, width: u32, height: u32, orientation: u16) {
    let img = RgbImage::from_fn(width, height, |x, _| image::Rgb([(x % 256) as u8, 0, 0]));
    let mut encoded = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut encoded)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();

    // Big-endian TIFF header, one IFD entry: 0x0112 Orientation, SHORT, count 1
    let mut tiff = b"MM\0\x2A\0\0\0\x08\0\x01\x01\x12\0\x03\0\0\0\x01".to_vec();
    tiff.extend_from_slice(&orientation.to_be_bytes());
    tiff.extend_from_slice(&[0, 0, 0, 0, 0, 0]);

    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(&tiff);
    let segment_len = (payload.len() + 2) as u16;

    let mut jpeg = encoded[..2].to_vec();
    jpeg.extend_from_slice(&[0xFF, 0xE1]);
    jpeg.extend_from_slice(&segment_len.to_be_bytes());
    jpeg.extend_from_slice(&payload);
    jpeg.extend_from_slice(&encoded[2..]);
    std::fs::write(path, jpeg).unwrap();
}

/// Names of the entries inside a zip archive, in archive order.
pub fn zip_entry_names<R: std::io::Read + std::io::Seek>(reader: R) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(reader).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}
