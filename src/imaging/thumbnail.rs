//! Bounded preview generation.

use super::ImagingError;
use super::calculations::calculate_bounded_dimensions;
use image::DynamicImage;
use image::imageops::FilterType;

/// Configuration for thumbnail generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailConfig {
    /// Largest allowed width in pixels.
    pub max_width: u32,
    /// Largest allowed height in pixels.
    pub max_height: u32,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            max_width: 200,
            max_height: 200,
        }
    }
}

/// Shrink a decoded raster to fit the configured box with Lanczos3.
///
/// Always works from the decoded raster, never from re-encoded bytes, and
/// never upscales. An image already inside the box comes back unchanged.
pub fn create_thumbnail(
    img: &DynamicImage,
    config: &ThumbnailConfig,
) -> Result<DynamicImage, ImagingError> {
    let source = (img.width(), img.height());
    if source.0 == 0 || source.1 == 0 || config.max_width == 0 || config.max_height == 0 {
        return Err(ImagingError::Thumbnail {
            width: source.0,
            height: source.1,
        });
    }

    let (width, height) =
        calculate_bounded_dimensions(source, (config.max_width, config.max_height));
    if (width, height) == source {
        return Ok(img.clone());
    }

    let thumb = img.resize_exact(width, height, FilterType::Lanczos3);
    if (thumb.width(), thumb.height()) != (width, height) {
        return Err(ImagingError::Thumbnail {
            width: source.0,
            height: source.1,
        });
    }
    Ok(thumb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::encode_canonical;
    use crate::test_helpers::gradient;

    #[test]
    fn landscape_is_bounded_by_width() {
        let thumb = create_thumbnail(&gradient(800, 600), &ThumbnailConfig::default()).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (200, 150));
    }

    #[test]
    fn portrait_is_bounded_by_height() {
        let thumb = create_thumbnail(&gradient(300, 900), &ThumbnailConfig::default()).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (67, 200));
    }

    #[test]
    fn small_image_is_not_upscaled() {
        let img = gradient(64, 48);
        let thumb = create_thumbnail(&img, &ThumbnailConfig::default()).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (64, 48));
        assert_eq!(thumb.to_rgb8(), img.to_rgb8());
    }

    #[test]
    fn custom_box_is_respected() {
        let config = ThumbnailConfig {
            max_width: 50,
            max_height: 100,
        };
        let thumb = create_thumbnail(&gradient(400, 400), &config).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (50, 50));
    }

    #[test]
    fn thumbnail_is_deterministic_after_encoding() {
        let img = gradient(640, 480);
        let config = ThumbnailConfig::default();
        let a = encode_canonical(&create_thumbnail(&img, &config).unwrap()).unwrap();
        let b = encode_canonical(&create_thumbnail(&img, &config).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn zero_sized_box_is_an_error() {
        let config = ThumbnailConfig {
            max_width: 0,
            max_height: 200,
        };
        let err = create_thumbnail(&gradient(10, 10), &config).unwrap_err();
        assert!(matches!(
            err,
            ImagingError::Thumbnail {
                width: 10,
                height: 10
            }
        ));
    }
}
