//! Column identifiers, mutations and atomic row batches.

use std::time::{SystemTime, UNIX_EPOCH};

/// Every column of a picture row.
///
/// The store sees only byte-string names; this enum is the one place those
/// names are spelled out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Picture,
    Thumbnail,
    Title,
    Description,
    AltText,
    ContentType,
    Owner,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::Picture,
        Column::Thumbnail,
        Column::Title,
        Column::Description,
        Column::AltText,
        Column::ContentType,
        Column::Owner,
    ];

    /// Metadata columns included in every read.
    pub const METADATA: [Column; 4] = [
        Column::Title,
        Column::Description,
        Column::ContentType,
        Column::AltText,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::Picture => "picture",
            Column::Thumbnail => "thumbnail",
            Column::Title => "title",
            Column::Description => "description",
            Column::AltText => "alt_text",
            Column::ContentType => "content_type",
            Column::Owner => "owner",
        }
    }

    /// Map a stored column name back to its identifier.
    pub fn from_name(name: &[u8]) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name().as_bytes() == name)
    }
}

/// Write time shared by every mutation of one ingestion, in nanoseconds since
/// the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WriteTimestamp(pub i64);

impl WriteTimestamp {
    pub fn now() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        Self(i64::try_from(nanos).unwrap_or(i64::MAX))
    }
}

/// One column write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub column: Column,
    pub value: Vec<u8>,
    pub timestamp: WriteTimestamp,
}

impl Mutation {
    /// Raw column name as sent to the store.
    pub fn name(&self) -> &'static [u8] {
        self.column.name().as_bytes()
    }
}

/// Build a single column write. Pure; no I/O.
pub fn build(column: Column, value: impl Into<Vec<u8>>, timestamp: WriteTimestamp) -> Mutation {
    Mutation {
        column,
        value: value.into(),
        timestamp,
    }
}

/// All mutations for one row, submitted to the store as a single atomic unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchWrite {
    pub row_key: Vec<u8>,
    pub column_family: String,
    pub mutations: Vec<Mutation>,
}

impl BatchWrite {
    pub fn new(row_key: impl Into<Vec<u8>>, column_family: impl Into<String>) -> Self {
        Self {
            row_key: row_key.into(),
            column_family: column_family.into(),
            mutations: Vec::new(),
        }
    }

    /// Append a mutation, builder style.
    pub fn with(mut self, mutation: Mutation) -> Self {
        self.mutations.push(mutation);
        self
    }

    pub fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        self.mutations.iter().map(|m| m.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for column in Column::ALL {
            assert_eq!(Column::from_name(column.name().as_bytes()), Some(column));
        }
    }

    #[test]
    fn unknown_name_is_none() {
        assert_eq!(Column::from_name(b"exif"), None);
        assert_eq!(Column::from_name(b"Title"), None);
    }

    #[test]
    fn store_column_names_are_stable() {
        let names: Vec<&str> = Column::ALL.iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            [
                "picture",
                "thumbnail",
                "title",
                "description",
                "alt_text",
                "content_type",
                "owner"
            ]
        );
    }

    #[test]
    fn build_keeps_timestamp() {
        let ts = WriteTimestamp(42);
        let m = build(Column::Title, "Dusk", ts);
        assert_eq!(m.name(), b"title");
        assert_eq!(m.value, b"Dusk");
        assert_eq!(m.timestamp, ts);
    }

    #[test]
    fn batch_collects_mutations_in_order() {
        let ts = WriteTimestamp(7);
        let batch = BatchWrite::new(vec![1, 2, 3], "picture")
            .with(build(Column::Picture, vec![0u8; 4], ts))
            .with(build(Column::Title, "t", ts));
        assert_eq!(batch.row_key, vec![1, 2, 3]);
        assert_eq!(batch.column_family, "picture");
        assert_eq!(
            batch.columns().collect::<Vec<_>>(),
            [Column::Picture, Column::Title]
        );
    }

    #[test]
    fn now_is_after_epoch() {
        assert!(WriteTimestamp::now().0 > 0);
    }
}
