//! Image processing: decode, canonicalize, thumbnail.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory` (format sniffed from magic bytes) |
//! | **Canonical encode** | PNG via `DynamicImage::write_to` |
//! | **Thumbnail** | `resize_exact` with Lanczos3 into a bounded box |
//!
//! The module is split into:
//! - **Calculations**: pure dimension math (unit testable)
//! - **Codec**: decoding uploads, producing canonical bytes
//! - **Thumbnail**: bounded previews from a decoded raster

mod calculations;
pub mod codec;
pub mod thumbnail;

use thiserror::Error;

pub use calculations::calculate_bounded_dimensions;
pub use codec::{CANONICAL_MIME, decode, encode_canonical, format_for_extension};
pub use thumbnail::{ThumbnailConfig, create_thumbnail};

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),
    #[error("failed to thumbnail {width}x{height} image")]
    Thumbnail { width: u32, height: u32 },
}
