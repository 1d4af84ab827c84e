//! Picture records exchanged with the repository.

use crate::hash::PictureId;
use serde::Serialize;

/// A picture as read back from the store.
///
/// `contents` holds exactly one artifact (full image or thumbnail) and only
/// when that artifact was requested and present; otherwise it is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Picture {
    pub id: PictureId,
    #[serde(skip)]
    pub contents: Vec<u8>,
    pub content_type: String,
    pub title: String,
    pub description: String,
    pub alt_text: String,
}

impl Picture {
    /// An empty record for `id`, filled in column by column.
    pub fn empty(id: PictureId) -> Self {
        Self {
            id,
            contents: Vec::new(),
            content_type: String::new(),
            title: String::new(),
            description: String::new(),
            alt_text: String::new(),
        }
    }

    /// Whether the requested artifact came back. A row can exist without it.
    pub fn has_contents(&self) -> bool {
        !self.contents.is_empty()
    }
}

/// An upload waiting to be ingested. It has no id until it is stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPicture {
    /// Raw upload bytes, in any supported format.
    pub contents: Vec<u8>,
    /// MIME type as declared by the uploader; not checked against the bytes.
    pub content_type: String,
    pub title: String,
    pub description: String,
    pub alt_text: String,
}

impl NewPicture {
    pub fn new(contents: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self {
            contents: contents.into(),
            content_type: content_type.into(),
            ..Self::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn alt_text(mut self, alt_text: impl Into<String>) -> Self {
        self.alt_text = alt_text.into();
        self
    }
}
