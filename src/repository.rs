//! The picture repository: ingestion and retrieval over a column store.
//!
//! ## Write path
//!
//! ```text
//! upload bytes ─ decode ─┬─ encode PNG ─ SHA-256 ─→ id (row key)
//!                        └─ thumbnail ─ encode PNG
//!   picture, thumbnail, title, description, owner, alt_text, content_type
//!   → one BatchWrite, one timestamp, QUORUM
//! ```
//!
//! The id depends only on the canonical PNG of the decoded pixels, so
//! uploading the same picture again rewrites the same row at a newer
//! timestamp. That is deduplication, not an error. Concurrent uploads of the
//! same pixels are not coordinated: the store resolves each column by its own
//! last-write-wins rule.
//!
//! ## Read path
//!
//! Reads fetch the four metadata columns plus at most one artifact column at
//! consistency ONE. A row with no columns at all is [`RepositoryError::ImageNotFound`];
//! a row without the requested artifact is a [`Picture`] with empty `contents`.
//!
//! ## Errors
//!
//! Every store fault is translated into a [`RepositoryError`] at this
//! boundary and returned. Nothing is retried and nothing is logged here.

use crate::config::PikshrConfig;
use crate::hash::{InvalidIdError, PictureId};
use crate::imaging::{self, ImagingError, ThumbnailConfig};
use crate::store::{
    BatchWrite, Column, Consistency, RecentIndex, SlicePredicate, StoreFault, StoreTransport,
    WriteTimestamp, build,
};
use crate::types::{NewPicture, Picture};
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    /// The upload is not an image we can decode.
    #[error("failed to decode upload: {0}")]
    Decode(#[source] image::ImageError),
    /// Re-encoding or thumbnailing a decoded image failed.
    #[error("image processing failed: {0}")]
    Processing(#[source] ImagingError),
    /// A client-supplied id is not a hex digest.
    #[error(transparent)]
    InvalidId(#[from] InvalidIdError),
    /// The row has none of the requested columns.
    #[error("Image not found")]
    ImageNotFound,
    /// The store rejected the request; the reason is passed through verbatim.
    #[error("{0}")]
    InvalidRequest(String),
    #[error("Unavailable")]
    Unavailable,
    #[error("Timed out")]
    TimedOut,
    #[error("transport error: {0}")]
    Transport(String),
}

/// Coarse classification for callers that speak HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    NotFound,
    BadRequest,
    Unavailable,
    Internal,
}

impl RepositoryError {
    /// Faults worth retrying later with the same request.
    pub fn is_transient(&self) -> bool {
        matches!(self, RepositoryError::Unavailable | RepositoryError::TimedOut)
    }

    pub fn status_class(&self) -> StatusClass {
        match self {
            RepositoryError::ImageNotFound => StatusClass::NotFound,
            RepositoryError::Decode(_) | RepositoryError::InvalidId(_) => StatusClass::BadRequest,
            RepositoryError::Unavailable | RepositoryError::TimedOut => StatusClass::Unavailable,
            RepositoryError::Processing(_)
            | RepositoryError::InvalidRequest(_)
            | RepositoryError::Transport(_) => StatusClass::Internal,
        }
    }
}

impl From<ImagingError> for RepositoryError {
    fn from(e: ImagingError) -> Self {
        match e {
            ImagingError::Decode(inner) => RepositoryError::Decode(inner),
            other => RepositoryError::Processing(other),
        }
    }
}

impl From<StoreFault> for RepositoryError {
    fn from(fault: StoreFault) -> Self {
        match fault {
            StoreFault::InvalidRequest { why } => RepositoryError::InvalidRequest(why),
            StoreFault::Unavailable => RepositoryError::Unavailable,
            StoreFault::TimedOut => RepositoryError::TimedOut,
            StoreFault::Transport(msg) => RepositoryError::Transport(msg),
        }
    }
}

/// A failed ingestion.
///
/// `id` is set whenever the failure happened after hashing, so callers can
/// tie the failure to the content that would have been stored.
#[derive(Error, Debug)]
#[error("{source}")]
pub struct InsertError {
    pub id: Option<PictureId>,
    #[source]
    pub source: RepositoryError,
}

impl InsertError {
    fn before_id(e: impl Into<RepositoryError>) -> Self {
        Self {
            id: None,
            source: e.into(),
        }
    }
}

/// Where the repository writes and how hard it insists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySettings {
    pub column_family: String,
    pub read_consistency: Consistency,
    pub write_consistency: Consistency,
    pub thumbnails: ThumbnailConfig,
}

impl RepositorySettings {
    pub fn from_config(config: &PikshrConfig) -> Self {
        Self {
            column_family: config.store.column_family.clone(),
            read_consistency: config.consistency.read,
            write_consistency: config.consistency.write,
            thumbnails: ThumbnailConfig {
                max_width: config.thumbnails.max_width,
                max_height: config.thumbnails.max_height,
            },
        }
    }
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self::from_config(&PikshrConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Artifact {
    Full,
    Thumbnail,
}

impl Artifact {
    fn column(self) -> Column {
        match self {
            Artifact::Full => Column::Picture,
            Artifact::Thumbnail => Column::Thumbnail,
        }
    }
}

fn text(value: Vec<u8>) -> String {
    String::from_utf8(value).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Picture storage over an injected store transport.
///
/// Holds no state besides the transport handle and its settings; every call
/// stands alone. Shareable across threads whenever the transport is.
#[derive(Debug)]
pub struct PictureRepository<T> {
    transport: T,
    settings: RepositorySettings,
}

impl<T: StoreTransport> PictureRepository<T> {
    pub fn new(transport: T) -> Self {
        Self::with_settings(transport, RepositorySettings::default())
    }

    pub fn with_settings(transport: T, settings: RepositorySettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn settings(&self) -> &RepositorySettings {
        &self.settings
    }

    /// Ingest an upload on behalf of `owner` and return its id.
    ///
    /// Decode failures happen before any store interaction and carry no id.
    pub fn insert_picture(
        &self,
        upload: &NewPicture,
        owner: &str,
    ) -> Result<PictureId, InsertError> {
        let now = WriteTimestamp::now();
        let img = imaging::decode(&upload.contents).map_err(InsertError::before_id)?;
        let full = imaging::encode_canonical(&img).map_err(InsertError::before_id)?;
        let id = PictureId::digest(&full);

        self.store_artifacts(id, img, full, upload, owner, now)
            .map_err(|source| InsertError {
                id: Some(id),
                source,
            })?;
        Ok(id)
    }

    fn store_artifacts(
        &self,
        id: PictureId,
        img: DynamicImage,
        full: Vec<u8>,
        upload: &NewPicture,
        owner: &str,
        now: WriteTimestamp,
    ) -> Result<(), RepositoryError> {
        let thumb = imaging::create_thumbnail(&img, &self.settings.thumbnails)?;
        drop(img);
        let thumb = imaging::encode_canonical(&thumb)?;

        let batch = BatchWrite::new(id.row_key(), self.settings.column_family.as_str())
            .with(build(Column::Picture, full, now))
            .with(build(Column::Thumbnail, thumb, now))
            .with(build(Column::Title, upload.title.as_str(), now))
            .with(build(Column::Description, upload.description.as_str(), now))
            .with(build(Column::Owner, owner, now))
            .with(build(Column::AltText, upload.alt_text.as_str(), now))
            .with(build(Column::ContentType, upload.content_type.as_str(), now));

        self.transport
            .atomic_batch_mutate(&batch, self.settings.write_consistency)?;
        Ok(())
    }

    /// Metadata plus the full canonical image.
    pub fn get_picture(&self, id: &str) -> Result<Picture, RepositoryError> {
        self.read_row(id, Some(Artifact::Full))
    }

    /// Metadata plus the thumbnail.
    pub fn get_thumbnail(&self, id: &str) -> Result<Picture, RepositoryError> {
        self.read_row(id, Some(Artifact::Thumbnail))
    }

    /// Metadata only; `contents` is always empty.
    pub fn get_metadata(&self, id: &str) -> Result<Picture, RepositoryError> {
        self.read_row(id, None)
    }

    fn read_row(&self, id: &str, artifact: Option<Artifact>) -> Result<Picture, RepositoryError> {
        let id = PictureId::from_hex(id)?;
        self.read_row_by_id(id, artifact)
    }

    fn read_row_by_id(
        &self,
        id: PictureId,
        artifact: Option<Artifact>,
    ) -> Result<Picture, RepositoryError> {
        let wanted = artifact.map(Artifact::column);
        let predicate = SlicePredicate::from_columns(Column::METADATA.into_iter().chain(wanted));
        let columns = self.transport.get_slice(
            id.row_key(),
            &self.settings.column_family,
            &predicate,
            self.settings.read_consistency,
        )?;
        if columns.is_empty() {
            return Err(RepositoryError::ImageNotFound);
        }

        let mut picture = Picture::empty(id);
        for stored in columns {
            let Some(column) = Column::from_name(&stored.name) else {
                continue;
            };
            match column {
                Column::Title => picture.title = text(stored.value),
                Column::Description => picture.description = text(stored.value),
                Column::ContentType => picture.content_type = text(stored.value),
                Column::AltText => picture.alt_text = text(stored.value),
                Column::Picture | Column::Thumbnail => {
                    if wanted == Some(column) {
                        picture.contents = stored.value;
                    }
                }
                Column::Owner => {}
            }
        }
        Ok(picture)
    }
}

impl<T: StoreTransport + RecentIndex> PictureRepository<T> {
    /// Metadata of up to `limit` most recent pictures, newest first.
    ///
    /// An empty or absent `owner` lists everyone's pictures. Rows that vanish
    /// between the index lookup and the read are skipped.
    pub fn recent_pictures(
        &self,
        owner: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Picture>, RepositoryError> {
        let owner = owner.filter(|o| !o.is_empty());
        let keys = self.transport.recent_row_keys(
            &self.settings.column_family,
            owner,
            limit,
            self.settings.read_consistency,
        )?;

        let mut pictures = Vec::with_capacity(keys.len());
        for key in keys {
            let id = PictureId::from_row_key(&key).map_err(|e| {
                RepositoryError::Transport(format!("recent index returned a bad row key: {e}"))
            })?;
            match self.read_row_by_id(id, None) {
                Ok(picture) => pictures.push(picture),
                Err(RepositoryError::ImageNotFound) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(pictures)
    }
}
