//! Decoding uploads and producing the canonical encoding.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (PNG, JPEG, GIF, TIFF, WebP, BMP) | `image::load_from_memory` |
//! | Canonical encode | `DynamicImage::write_to` as PNG |
//!
//! PNG is lossless, so decoding the canonical bytes always gives back the
//! pixels that were hashed.

use super::ImagingError;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// The one format every stored artifact is written in.
pub const CANONICAL_FORMAT: ImageFormat = ImageFormat::Png;

/// MIME type of [`CANONICAL_FORMAT`].
pub const CANONICAL_MIME: &str = "image/png";

/// Upload formats with a decoder compiled in, keyed by file extension.
const UPLOAD_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("png", ImageFormat::Png),
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("gif", ImageFormat::Gif),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
    ("bmp", ImageFormat::Bmp),
];

/// Look up the upload format for a file extension (case-insensitive).
///
/// Returns `None` for extensions without a working decoder.
pub fn format_for_extension(ext: &str) -> Option<ImageFormat> {
    UPLOAD_CANDIDATES
        .iter()
        .find(|(candidate, fmt)| candidate.eq_ignore_ascii_case(ext) && fmt.reading_enabled())
        .map(|(_, fmt)| *fmt)
}

/// Decode an upload into a raster, sniffing the format from its magic bytes.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, ImagingError> {
    image::load_from_memory(bytes).map_err(ImagingError::Decode)
}

/// Encode a raster as canonical PNG into a freshly allocated buffer.
///
/// Floating-point rasters (e.g. from HDR TIFFs) have no PNG representation and
/// are narrowed to 16-bit RGBA first.
pub fn encode_canonical(img: &DynamicImage) -> Result<Vec<u8>, ImagingError> {
    let mut buf = Vec::new();
    let narrowed;
    let img = match img {
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            narrowed = DynamicImage::ImageRgba16(img.to_rgba16());
            &narrowed
        }
        other => other,
    };
    img.write_to(&mut Cursor::new(&mut buf), CANONICAL_FORMAT)
        .map_err(ImagingError::Encode)?;
    Ok(buf)
}
