//! Pure-Rust image processing.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Preview** | EXIF orientation + Lanczos3 fit-inside + JPEG encode |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use calculations::calculate_fit_dimensions;
pub use operations::{PreviewSpec, create_preview};
pub use params::{PreviewParams, Quality};
pub use rust_backend::RustBackend;
