//! Shared test utilities: synthetic images and a ready-made repository.

use crate::repository::PictureRepository;
use crate::store::MemoryStore;
use crate::types::NewPicture;
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;

/// A deterministic RGB gradient. Distinct sizes give distinct pixels.
pub fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

/// Encode `img` in `format`, as an uploader's file would be.
pub fn to_bytes(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

/// A PNG upload of `img` with no metadata.
pub fn png_upload(img: &DynamicImage) -> NewPicture {
    NewPicture::new(to_bytes(img, ImageFormat::Png), "image/png")
}

/// Repository over an empty single-replica store with the `picture` family.
pub fn memory_repository() -> PictureRepository<MemoryStore> {
    let store = MemoryStore::connect("pikshr")
        .unwrap()
        .with_column_family("picture");
    PictureRepository::new(store)
}
