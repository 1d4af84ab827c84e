//! # pikshr
//!
//! A content-addressed picture repository on top of a distributed,
//! column-oriented store.
//!
//! Uploads are decoded, re-encoded as PNG, hashed, thumbnailed and written as
//! one row. Reads fetch a row by id with only the columns the caller needs.
//!
//! # Architecture
//!
//! ```text
//! upload ─→ imaging::decode ─→ imaging::encode_canonical ─→ hash::PictureId
//!                    │
//!                    └─→ imaging::create_thumbnail ─→ encode_canonical
//!
//! PictureRepository ─→ store::BatchWrite ─→ StoreTransport (atomic, QUORUM)
//! PictureRepository ←─ store::get_slice  ←─ StoreTransport (ONE)
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`repository`] | Ingestion pipeline, retrieval, store-fault translation |
//! | [`imaging`] | Decode uploads, canonical PNG encoding, bounded thumbnails |
//! | [`hash`] | SHA-256 picture ids and their hex form |
//! | [`store`] | Transport trait, column/mutation types, in-memory store |
//! | [`types`] | `Picture` and `NewPicture` records |
//! | [`config`] | `pikshr.toml` loading and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Content Addressing
//!
//! A picture's id is the digest of its canonical PNG, not of the upload.
//! The same pixels uploaded as JPEG-then-PNG, or twice as the same file, map
//! to the same row. A second upload overwrites the row's columns at a newer
//! timestamp; there is no "already exists" error.
//!
//! ## One Row, One Batch
//!
//! Full image, thumbnail and metadata are written as a single atomic batch
//! with a single timestamp, so a reader never sees the thumbnail of one upload
//! next to the title of another from the same call.
//!
//! ## Not Found Is Not Empty
//!
//! A row without any requested column is [`RepositoryError::ImageNotFound`].
//! A row that exists but lacks the requested artifact comes back as a
//! [`Picture`] with empty `contents`. Web layers map the first to 404 and
//! decide for themselves about the second.
//!
//! ## Transport Is Injected
//!
//! [`PictureRepository`] owns its [`StoreTransport`] for its whole lifetime.
//! There is no global client. Tests swap in a recording mock; the CLI uses
//! [`store::MemoryStore`].

pub mod config;
pub mod hash;
pub mod imaging;
pub mod output;
pub mod repository;
pub mod store;
pub mod types;

pub use hash::PictureId;
pub use repository::{InsertError, PictureRepository, RepositoryError, StatusClass};
pub use store::StoreTransport;
pub use types::{NewPicture, Picture};

#[cfg(test)]
pub(crate) mod test_helpers;
