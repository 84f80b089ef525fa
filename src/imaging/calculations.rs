//! Pure calculation functions for preview dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate the size of an image scaled to fit inside a square bounding box.
///
/// The longer edge becomes `max_edge` and the shorter edge keeps the source
/// aspect ratio (rounded, never below 1px). Images that already fit are never
/// enlarged: the result is `None` and the caller keeps the original pixels.
///
/// # Examples
/// ```
/// # use rawshelf::imaging::calculate_fit_dimensions;
/// // 6000x4000 landscape into a 400px box → 400x267
/// assert_eq!(calculate_fit_dimensions((6000, 4000), 400), Some((400, 267)));
///
/// // Already small enough → untouched
/// assert_eq!(calculate_fit_dimensions((300, 200), 400), None);
/// ```
pub fn calculate_fit_dimensions(original: (u32, u32), max_edge: u32) -> Option<(u32, u32)> {
    let (orig_w, orig_h) = original;
    let longer_edge = orig_w.max(orig_h);

    if longer_edge <= max_edge || orig_w == 0 || orig_h == 0 {
        return None;
    }

    let ratio = max_edge as f64 / longer_edge as f64;
    let scale = |v: u32| ((v as f64 * ratio).round() as u32).max(1);

    if orig_w >= orig_h {
        // Landscape or square
        Some((max_edge, scale(orig_h)))
    } else {
        // Portrait
        Some((scale(orig_w), max_edge))
    }
}
