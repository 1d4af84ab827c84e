//! Pure calculation functions for thumbnail dimensions.
//!
//! Nothing here touches pixels, so the bounding rules can be tested without
//! decoding a single image.

/// Fit `source` inside a `bound` box, preserving aspect ratio.
///
/// Images already inside the box are returned unchanged (never upscaled).
/// Otherwise the limiting edge lands exactly on the box and the other edge is
/// rounded to the nearest pixel, with a floor of one pixel.
///
/// # Examples
/// ```
/// # use pikshr::imaging::calculate_bounded_dimensions;
/// // 800x600 landscape into 200x200 → 200x150
/// assert_eq!(calculate_bounded_dimensions((800, 600), (200, 200)), (200, 150));
///
/// // Small images are left alone
/// assert_eq!(calculate_bounded_dimensions((120, 80), (200, 200)), (120, 80));
/// ```
pub fn calculate_bounded_dimensions(source: (u32, u32), bound: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bound;

    if src_w <= max_w && src_h <= max_h {
        return (src_w, src_h);
    }

    let ratio = f64::min(max_w as f64 / src_w as f64, max_h as f64 / src_h as f64);
    let w = ((src_w as f64 * ratio).round() as u32).clamp(1, max_w);
    let h = ((src_h as f64 * ratio).round() as u32).clamp(1, max_h);
    (w, h)
}
