//! End-to-end behaviour of the repository over the in-process store.

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use pikshr::store::{Consistency, MemoryStore, StoreFault};
use pikshr::{NewPicture, PictureId, PictureRepository, RepositoryError, StatusClass};
use std::io::Cursor;
use tempfile::TempDir;

fn checkerboard(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        if (x / 8 + y / 8) % 2 == 0 {
            Rgb([240, 240, 240])
        } else {
            Rgb([20, (x % 256) as u8, (y % 256) as u8])
        }
    }))
}

fn encoded(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

fn store() -> MemoryStore {
    MemoryStore::connect("pikshr")
        .unwrap()
        .with_column_family("picture")
        .with_replication(3)
}

#[test]
fn upload_then_read_every_artifact() {
    let repo = PictureRepository::new(store());
    let img = checkerboard(640, 480);
    let upload = NewPicture::new(encoded(&img, ImageFormat::Png), "image/png")
        .title("Board")
        .description("Squares")
        .alt_text("a grey checkerboard");

    let id = repo.insert_picture(&upload, "alice").unwrap();
    let key = id.to_hex();
    assert_eq!(key.len(), 64);

    let full = repo.get_picture(&key).unwrap();
    assert_eq!(PictureId::digest(&full.contents), id);
    let decoded = image::load_from_memory(&full.contents).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (640, 480));
    assert_eq!(full.title, "Board");
    assert_eq!(full.content_type, "image/png");

    let thumb = repo.get_thumbnail(&key).unwrap();
    let decoded = image::load_from_memory(&thumb.contents).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (200, 150));

    let meta = repo.get_metadata(&key).unwrap();
    assert!(meta.contents.is_empty());
    assert_eq!(meta.description, "Squares");
    assert_eq!(meta.alt_text, "a grey checkerboard");
}

#[test]
fn same_pixels_in_another_format_share_an_id() {
    let repo = PictureRepository::new(store());
    let img = checkerboard(64, 48);

    let from_png = repo
        .insert_picture(&NewPicture::new(encoded(&img, ImageFormat::Png), "image/png"), "")
        .unwrap();
    let from_bmp = repo
        .insert_picture(&NewPicture::new(encoded(&img, ImageFormat::Bmp), "image/bmp"), "")
        .unwrap();

    assert_eq!(from_png, from_bmp);
    assert_eq!(repo.transport().row_count("picture"), 1);
}

#[test]
fn reupload_overwrites_metadata() {
    let repo = PictureRepository::new(store());
    let bytes = encoded(&checkerboard(32, 32), ImageFormat::Png);

    let first = repo
        .insert_picture(&NewPicture::new(bytes.clone(), "image/png").title("old"), "bob")
        .unwrap();
    let second = repo
        .insert_picture(&NewPicture::new(bytes, "image/png").title("new"), "bob")
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(repo.get_metadata(&first.to_hex()).unwrap().title, "new");
}

#[test]
fn garbage_upload_writes_nothing() {
    let repo = PictureRepository::new(store());
    let err = repo
        .insert_picture(&NewPicture::new(b"not an image".to_vec(), "image/png"), "")
        .unwrap_err();

    assert!(err.id.is_none());
    assert!(matches!(err.source, RepositoryError::Decode(_)));
    assert_eq!(repo.transport().row_count("picture"), 0);
}

#[test]
fn unknown_and_malformed_ids() {
    let repo = PictureRepository::new(store());

    let missing = PictureId::digest(b"never stored").to_hex();
    let err = repo.get_picture(&missing).unwrap_err();
    assert!(matches!(err, RepositoryError::ImageNotFound));
    assert_eq!(err.status_class(), StatusClass::NotFound);

    let err = repo.get_metadata("xyz").unwrap_err();
    assert!(matches!(err, RepositoryError::InvalidId(_)));
    assert_eq!(err.status_class(), StatusClass::BadRequest);
}

#[test]
fn quorum_write_needs_a_majority() {
    let repo = PictureRepository::new(store());
    let upload = NewPicture::new(encoded(&checkerboard(16, 16), ImageFormat::Png), "image/png");

    repo.transport().set_live_replicas(1);
    let err = repo.insert_picture(&upload, "").unwrap_err();
    assert!(err.id.is_some());
    assert!(err.source.is_transient());
    assert_eq!(repo.transport().row_count("picture"), 0);

    repo.transport().set_live_replicas(2);
    let id = repo.insert_picture(&upload, "").unwrap();

    // ONE is enough to read it back with a single replica left.
    repo.transport().set_live_replicas(1);
    assert_eq!(repo.settings().read_consistency, Consistency::One);
    assert!(repo.get_metadata(&id.to_hex()).is_ok());
}

#[test]
fn injected_timeout_surfaces_as_timed_out() {
    let repo = PictureRepository::new(store());
    let upload = NewPicture::new(encoded(&checkerboard(16, 16), ImageFormat::Png), "image/png");
    let id = repo.insert_picture(&upload, "").unwrap();

    repo.transport().fail_next_with(StoreFault::TimedOut);
    let err = repo.get_thumbnail(&id.to_hex()).unwrap_err();
    assert!(matches!(err, RepositoryError::TimedOut));
    assert_eq!(err.status_class(), StatusClass::Unavailable);

    assert!(repo.get_thumbnail(&id.to_hex()).is_ok());
}

#[test]
fn recent_pictures_filters_by_owner() {
    let repo = PictureRepository::new(store());
    let mut ids = Vec::new();
    for (size, owner) in [(10, "alice"), (11, "bob"), (12, "alice")] {
        let upload =
            NewPicture::new(encoded(&checkerboard(size, size), ImageFormat::Png), "image/png");
        ids.push(repo.insert_picture(&upload, owner).unwrap());
    }

    let everyone: Vec<_> = repo
        .recent_pictures(None, 10)
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(everyone, vec![ids[2], ids[1], ids[0]]);

    let alice: Vec<_> = repo
        .recent_pictures(Some("alice"), 10)
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(alice, vec![ids[2], ids[0]]);

    assert_eq!(repo.recent_pictures(Some(""), 1).unwrap().len(), 1);
}

#[test]
fn snapshot_survives_reopen() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("store.json");

    let repo = PictureRepository::new(store());
    let upload = NewPicture::new(encoded(&checkerboard(24, 12), ImageFormat::Png), "image/png")
        .title("kept");
    let id = repo.insert_picture(&upload, "carol").unwrap();
    repo.transport().save(&path).unwrap();

    let reopened = MemoryStore::load("pikshr", &path).unwrap();
    reopened.define_column_family("picture");
    let repo = PictureRepository::new(reopened);

    let picture = repo.get_picture(&id.to_hex()).unwrap();
    assert_eq!(picture.title, "kept");
    assert_eq!(PictureId::digest(&picture.contents), id);

    assert!(MemoryStore::load("elsewhere", &path).is_err());
}
